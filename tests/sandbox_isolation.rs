use codevolve::config::SandboxConfig;
use codevolve::engines::evaluation::{Executor, Fault, Sandbox};
use std::time::{Duration, Instant};

fn sandbox(timeout_ms: u64) -> Sandbox {
    Sandbox::new(&SandboxConfig {
        timeout_ms,
        ..Default::default()
    })
}

#[test]
fn test_normal_return() {
    // mov rax, rdx; ret
    let value = sandbox(2000).execute(&[0x48, 0x89, 0xD0, 0xC3]).unwrap();
    assert_eq!(value, 10);
}

#[test]
fn test_division_by_zero_is_arithmetic_fault() {
    // xor rcx, rcx; div rcx; ret
    let result = sandbox(2000).execute(&[0x48, 0x31, 0xC9, 0x48, 0xF7, 0xF1, 0xC3]);
    assert!(matches!(result, Err(Fault::ArithmeticFault)), "{:?}", result);
}

#[test]
fn test_infinite_loop_times_out() {
    let timeout = Duration::from_millis(300);
    let started = Instant::now();

    // jmp to itself
    let result = sandbox(300).execute(&[0xE9, 0xFB, 0xFF, 0xFF, 0xFF]);

    assert!(matches!(result, Err(Fault::Timeout(t)) if t == timeout), "{:?}", result);
    let elapsed = started.elapsed();
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(2), "took {:?}", elapsed);
}

#[test]
fn test_wild_write_is_contained() {
    // xor rax, rax; mov [rax], rax; ret
    let result = sandbox(2000).execute(&[0x48, 0x31, 0xC0, 0x48, 0x89, 0x00, 0xC3]);
    assert!(
        matches!(result, Err(Fault::Crashed { signal }) if signal == libc::SIGSEGV),
        "{:?}",
        result
    );
}

#[test]
fn test_host_survives_many_faults() {
    let sandbox = sandbox(2000);
    for _ in 0..20 {
        assert!(sandbox
            .execute(&[0x48, 0x31, 0xC9, 0x48, 0xF7, 0xF1, 0xC3])
            .is_err());
    }
    // still able to run good code afterwards
    assert_eq!(sandbox.execute(&[0x48, 0x89, 0xF0, 0xC3]).unwrap(), 12);
}
