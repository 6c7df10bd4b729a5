//! Skip protocol as seen from a conformance case.
//!
//! Skipping cases run in a child so the printed marker can be inspected the
//! way the orchestrator inspects it.

use hipcts::harness::is_skip_output;
use hipcts::prelude::*;

fn device_with_arch(arch: &str) -> HostDevices {
    HostDevices::single(DeviceProps {
        arch_name: arch.to_string(),
        multi_processor_count: 8,
        ..DeviceProps::default()
    })
}

/// Body of a case that needs page-fault based host access.
fn xnack_case(devices: &dyn DeviceQuery) -> bool {
    let ordinal = hip_check!(devices.current_device());
    let props = hip_check!(devices.properties(ordinal));
    if !props.xnack_enabled() {
        skip_test("GPU is not xnack enabled");
        return true;
    }
    props.multi_processor_count > 0
}

#[test]
fn missing_capability_skips() {
    let report = run_isolated("missing_capability_skips", &[], || {
        xnack_case(&device_with_arch("gfx90a:sramecc+:xnack-"))
    })
    .unwrap();
    assert!(report.skipped());
    assert!(report
        .stdout
        .contains("Skipping test. Reason: GPU is not xnack enabled"));
}

#[test]
fn present_capability_runs() {
    let report = run_isolated("present_capability_runs", &[], || {
        xnack_case(&device_with_arch("gfx90a:sramecc+:xnack+"))
    })
    .unwrap();
    assert!(!report.skipped());
    assert!(!is_skip_output(&report.stdout));
}

#[test]
fn gfx11_timing_case_skips_before_any_check() {
    let report = run_isolated("gfx11_timing_case_skips_before_any_check", &[], || {
        let mut ctx = TestContext::new();
        let devices = device_with_arch("gfx1100");
        let props = hip_check!(devices.properties(0));
        if props.is_gfx11() {
            skip_test("shader clock is not used for timing on gfx11");
            return true;
        }
        spawn_workers(&ctx, 2, |_, ctx| require_thread!(ctx, false)).is_ok()
            && ctx.finalize_results().passed()
    })
    .unwrap();
    assert!(report.skipped());
}

#[test]
fn skip_marker_outside_its_own_line_is_not_a_skip() {
    let report = run_isolated("skip_marker_outside_its_own_line_is_not_a_skip", &[], || {
        println!("mentioning {} in passing", SKIP_MARKER);
        true
    })
    .unwrap();
    assert!(!report.skipped());
}
