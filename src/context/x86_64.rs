//! System V x86_64 context transfer
//!
//! Frame left on a suspended stack, from the saved stack pointer upwards:
//! r15, r14, r13, r12, rbx, rbp, return address.

use std::arch::global_asm;

global_asm!(
    ".text",
    ".global co_ring_context_resume",
    ".type co_ring_context_resume,@function",
    ".p2align 4",
    "co_ring_context_resume:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, rsi",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
    ".size co_ring_context_resume, .-co_ring_context_resume",
    ".global co_ring_context_activate",
    ".type co_ring_context_activate,@function",
    ".p2align 4",
    "co_ring_context_activate:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    // rsi = stack top, rdx = entry, rcx = arg
    "and rsi, -16",
    "mov rsp, rsi",
    "mov rdi, rcx",
    "xor ebp, ebp",
    "call rdx",
    "ud2",
    ".size co_ring_context_activate, .-co_ring_context_activate",
);
