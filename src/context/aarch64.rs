//! AAPCS64 context transfer
//!
//! Frame left on a suspended stack, from the saved stack pointer upwards:
//! x19..x28, x29 (fp), x30 (lr), d8..d15.

use std::arch::global_asm;

global_asm!(
    ".text",
    ".global co_ring_context_resume",
    ".type co_ring_context_resume,%function",
    ".p2align 4",
    "co_ring_context_resume:",
    "sub sp, sp, #0xa0",
    "stp x19, x20, [sp, #0x00]",
    "stp x21, x22, [sp, #0x10]",
    "stp x23, x24, [sp, #0x20]",
    "stp x25, x26, [sp, #0x30]",
    "stp x27, x28, [sp, #0x40]",
    "stp x29, x30, [sp, #0x50]",
    "stp d8, d9, [sp, #0x60]",
    "stp d10, d11, [sp, #0x70]",
    "stp d12, d13, [sp, #0x80]",
    "stp d14, d15, [sp, #0x90]",
    "mov x9, sp",
    "str x9, [x0]",
    "mov sp, x1",
    "ldp x19, x20, [sp, #0x00]",
    "ldp x21, x22, [sp, #0x10]",
    "ldp x23, x24, [sp, #0x20]",
    "ldp x25, x26, [sp, #0x30]",
    "ldp x27, x28, [sp, #0x40]",
    "ldp x29, x30, [sp, #0x50]",
    "ldp d8, d9, [sp, #0x60]",
    "ldp d10, d11, [sp, #0x70]",
    "ldp d12, d13, [sp, #0x80]",
    "ldp d14, d15, [sp, #0x90]",
    "add sp, sp, #0xa0",
    "ret",
    ".size co_ring_context_resume, .-co_ring_context_resume",
    ".global co_ring_context_activate",
    ".type co_ring_context_activate,%function",
    ".p2align 4",
    "co_ring_context_activate:",
    "sub sp, sp, #0xa0",
    "stp x19, x20, [sp, #0x00]",
    "stp x21, x22, [sp, #0x10]",
    "stp x23, x24, [sp, #0x20]",
    "stp x25, x26, [sp, #0x30]",
    "stp x27, x28, [sp, #0x40]",
    "stp x29, x30, [sp, #0x50]",
    "stp d8, d9, [sp, #0x60]",
    "stp d10, d11, [sp, #0x70]",
    "stp d12, d13, [sp, #0x80]",
    "stp d14, d15, [sp, #0x90]",
    "mov x9, sp",
    "str x9, [x0]",
    // x1 = stack top, x2 = entry, x3 = arg
    "and x9, x1, #0xfffffffffffffff0",
    "mov sp, x9",
    "mov x0, x3",
    "mov x29, xzr",
    "mov x30, xzr",
    "blr x2",
    "brk #0",
    ".size co_ring_context_activate, .-co_ring_context_activate",
);
