use std::ptr;

use libc::sbrk;
use rallocator::Allocator;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().read_line(&mut String::new());
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
    println!(
        "[{}] PID = {}, program break (sbrk(0)) = {:?}",
        label,
        std::process::id(),
        unsafe { sbrk(0) },
    );
}

fn main() {
    env_logger::init();

    // Our segregated free-list allocator. Run with RUST_LOG=trace to see
    // every allocate/free/grow decision as it happens.
    let mut allocator = Allocator::new();
    allocator.init().expect("heap provider should have room");

    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate a small block and write through it.
    // --------------------------------------------------------------------
    let first = allocator.allocate(4);
    println!("\n[1] allocate(4) -> {:?}", first);
    unsafe { (first as *mut u32).write(0xDEADBEEF) };
    println!("[1] value written = 0x{:X}", unsafe { (first as *mut u32).read() });
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate an odd-sized block, observe the 8-byte rounded size.
    // --------------------------------------------------------------------
    let second = allocator.allocate(12);
    println!("\n[2] allocate(12) -> {:?}", second);
    unsafe { ptr::write_bytes(second, 0xAB, 12) };
    println!("[2] initialized second block with 0xAB");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Free the first block, then allocate something small again —
    //    the segregated free list should hand the same block back.
    // --------------------------------------------------------------------
    allocator.free(first);
    println!("\n[3] freed first block at {:?}", first);
    let third = allocator.allocate(4);
    println!(
        "[3] allocate(4) -> {:?} (reused freed block? {})",
        third,
        third == first
    );
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate something large enough to force heap growth.
    // --------------------------------------------------------------------
    print_program_break("before growth");
    let big = allocator.allocate(10_000);
    println!("\n[4] allocate(10000) -> {:?}", big);
    print_program_break("after growth");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Grow the second block in place via reallocate.
    // --------------------------------------------------------------------
    let grown = allocator.reallocate(second, 200);
    println!("\n[5] reallocate(second, 200) -> {:?}", grown);
    let prefix_ok = unsafe { std::slice::from_raw_parts(grown, 12) }
        .iter()
        .all(|&b| b == 0xAB);
    println!("[5] original 12 bytes preserved? {}", prefix_ok);

    assert!(allocator.check_invariants().is_ok());
    println!("\nAll invariants hold. Done.");
}
