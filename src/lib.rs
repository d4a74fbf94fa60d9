//! Dual channel square wave generator.
//!
//! A fixed 10 kHz tick advances a 100-step cycle counter; each step, two
//! output pins are driven high or low by comparing the counter against a
//! per-channel duty threshold entered over the serial console. The modules
//! here are hardware-free: the `square` and `square-rtic` binaries bind them
//! to SysTick/TIM2, GPIO and USART2.

#![no_std]

pub mod console;
pub mod duty;
pub mod wave;
