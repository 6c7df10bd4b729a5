//! Launch sizing helpers.

use hipcts_runtime::{DeviceProps, DeviceQuery, Status};

use crate::check_thread;
use crate::collector::TestContext;

/// Blocks for a grid that keeps every compute unit busy with
/// `blocks_per_cu` blocks, grown to cover `n` elements if that is not enough.
pub fn launch_blocks(
    props: &DeviceProps,
    blocks_per_cu: u32,
    threads_per_block: u32,
    n: usize,
) -> Result<u32, Status> {
    if threads_per_block == 0 {
        return Err(Status::ErrorInvalidValue);
    }
    let blocks = props
        .multi_processor_count
        .checked_mul(blocks_per_cu)
        .ok_or(Status::ErrorInvalidValue)?;

    let covered = u64::from(blocks) * u64::from(threads_per_block);
    if covered >= n as u64 {
        return Ok(blocks);
    }
    let needed = (n as u64).div_ceil(u64::from(threads_per_block));
    u32::try_from(needed).map_err(|_| Status::ErrorInvalidValue)
}

/// Blocks for a grid of `blocks_per_cu` per compute unit, trimmed to
/// `ceil(n / threads_per_block)` when that grid would overshoot `n`.
///
/// Worker threads size their grids this way so that several of them can
/// share the device; the grid is never grown past the saturating size.
pub fn trimmed_launch_blocks(
    props: &DeviceProps,
    blocks_per_cu: u32,
    threads_per_block: u32,
    n: usize,
) -> Result<u32, Status> {
    if threads_per_block == 0 {
        return Err(Status::ErrorInvalidValue);
    }
    let blocks = props
        .multi_processor_count
        .checked_mul(blocks_per_cu)
        .ok_or(Status::ErrorInvalidValue)?;

    let covered = u64::from(blocks) * u64::from(threads_per_block);
    if covered <= n as u64 {
        return Ok(blocks);
    }
    let needed = (n as u64).div_ceil(u64::from(threads_per_block));
    u32::try_from(needed).map_err(|_| Status::ErrorInvalidValue)
}

/// [`launch_blocks`] for the current device.
pub fn num_blocks(
    device: &dyn DeviceQuery,
    blocks_per_cu: u32,
    threads_per_block: u32,
    n: usize,
) -> Result<u32, Status> {
    let ordinal = device.current_device()?;
    let props = device.properties(ordinal)?;
    launch_blocks(&props, blocks_per_cu, threads_per_block, n)
}

/// Worker-thread launch sizing with [`trimmed_launch_blocks`].
///
/// Every device query is recorded in `ctx`. Yields 0 when a failure (here or
/// on a sibling thread) stopped the computation.
pub fn num_blocks_thread(
    ctx: &TestContext,
    device: &dyn DeviceQuery,
    blocks_per_cu: u32,
    threads_per_block: u32,
    n: usize,
) -> u32 {
    let ordinal = check_thread!(ctx, device.current_device(); 0);
    let props = check_thread!(ctx, device.properties(ordinal); 0);
    check_thread!(ctx, trimmed_launch_blocks(&props, blocks_per_cu, threads_per_block, n); 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hipcts_runtime::HostDevices;

    fn device(cus: u32) -> HostDevices {
        HostDevices::single(DeviceProps {
            multi_processor_count: cus,
            ..DeviceProps::default()
        })
    }

    #[test]
    fn saturating_grid_when_it_covers_n() {
        assert_eq!(num_blocks(&device(60), 4, 256, 1024), Ok(240));
    }

    #[test]
    fn grid_grows_to_cover_n() {
        // 2 CUs * 1 block * 64 threads = 128 < 1000
        assert_eq!(num_blocks(&device(2), 1, 64, 1000), Ok(16));
    }

    #[test]
    fn zero_threads_is_invalid() {
        assert_eq!(num_blocks(&device(2), 1, 0, 10), Err(Status::ErrorInvalidValue));
    }

    #[test]
    fn missing_device_propagates() {
        assert_eq!(
            num_blocks(&HostDevices::default(), 1, 64, 10),
            Err(Status::ErrorInvalidDevice)
        );
    }

    #[test]
    fn threaded_variant_trims_to_n() {
        let mut ctx = TestContext::new();
        // 4 CUs * 2 blocks * 256 threads = 2048 > 1024
        assert_eq!(num_blocks_thread(&ctx, &device(4), 2, 256, 1024), 4);
        assert_eq!(num_blocks_thread(&ctx, &device(4), 2, 256, 2048), 8);
        // Never grown past the saturating grid
        assert_eq!(num_blocks_thread(&ctx, &device(4), 2, 256, 4096), 8);
        assert_eq!(num_blocks_thread(&ctx, &device(4), 2, 256, 1), 1);
        assert!(ctx.finalize_results().passed());
    }

    #[test]
    fn threaded_variant_records_queries() {
        let mut ctx = TestContext::new();
        assert_eq!(num_blocks_thread(&ctx, &device(2), 1, 64, 1000), 2);
        let finalized = ctx.finalize_results();
        assert_eq!(finalized.total, 3);
        assert!(finalized.passed());
    }

    #[test]
    fn threaded_variant_yields_zero_after_failure() {
        let mut ctx = TestContext::new();
        assert_eq!(num_blocks_thread(&ctx, &HostDevices::default(), 1, 64, 10), 0);
        // Stopped by the earlier failure without recording
        assert_eq!(num_blocks_thread(&ctx, &device(2), 1, 64, 10), 0);
        let finalized = ctx.finalize_results();
        assert_eq!(finalized.total, 1);
        assert_eq!(finalized.failures[0].actual, Status::ErrorInvalidDevice);
    }
}
