#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::prelude::*;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::ThreadPool;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use std::sync::OnceLock;

use crate::error::Result;

/// Packages with fewer segments than this are decrypted on the calling thread.
pub(crate) const PARALLEL_MIN_SEGMENTS: usize = 8;

/// Crate-local Rayon pool for segment decryption.
///
/// The global Rayon pool panics on first use if it cannot be initialized (e.g. thread limits on
/// a busy CI host). A crate-local pool lets us fall back to sequential decryption instead.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn desired_rayon_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn build_rayon_pool() -> Option<ThreadPool> {
    let requested = desired_rayon_threads().max(1);
    let try_build = |n| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("agile-offcrypto-{i}"))
            .build()
    };

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::debug!("failed to build {requested}-thread pool ({err}); retrying with 1 thread");
            try_build(1).ok()
        }
        Err(err) => {
            log::debug!("failed to build decryption thread pool: {err}");
            None
        }
    }
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_rayon_pool).as_ref()
}

/// Run `f(index, chunk)` over each `chunk_len` chunk of `buf`, stopping at the first error.
///
/// Chunks are disjoint, so the parallel path writes every result at its own offset.
pub(crate) fn try_for_each_chunk<F>(
    buf: &mut [u8],
    chunk_len: usize,
    parallel: bool,
    f: F,
) -> Result<()>
where
    F: Fn(usize, &mut [u8]) -> Result<()> + Sync + Send,
{
    let chunks = buf.len().div_ceil(chunk_len);

    if parallel && chunks >= PARALLEL_MIN_SEGMENTS {
        if let Some(result) = try_for_each_chunk_parallel(buf, chunk_len, &f) {
            return result;
        }
    }

    log::debug!("decrypting {chunks} segments sequentially");
    buf.chunks_mut(chunk_len)
        .enumerate()
        .try_for_each(|(index, chunk)| f(index, chunk))
}

/// Returns `None` when no pool is available.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn try_for_each_chunk_parallel<F>(buf: &mut [u8], chunk_len: usize, f: &F) -> Option<Result<()>>
where
    F: Fn(usize, &mut [u8]) -> Result<()> + Sync + Send,
{
    let pool = rayon_pool()?;
    log::debug!(
        "decrypting {} segments on {} threads",
        buf.len().div_ceil(chunk_len),
        pool.current_num_threads()
    );
    Some(pool.install(|| {
        buf.par_chunks_mut(chunk_len)
            .enumerate()
            .try_for_each(|(index, chunk)| f(index, chunk))
    }))
}

#[cfg(not(all(feature = "parallel", not(target_arch = "wasm32"))))]
fn try_for_each_chunk_parallel<F>(_buf: &mut [u8], _chunk_len: usize, _f: &F) -> Option<Result<()>>
where
    F: Fn(usize, &mut [u8]) -> Result<()> + Sync + Send,
{
    None
}
