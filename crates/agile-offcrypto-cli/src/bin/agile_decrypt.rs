fn main() -> std::process::ExitCode {
    agile_offcrypto_cli::run()
}
