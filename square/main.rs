#![no_std]
#![no_main]

#[allow(unused)]
use panic_abort;

use core::fmt::Write;

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::{entry, exception, ExceptionFrame};
use hal::gpio::{LowSpeed, Output, PullNone, PushPull};
use hal::prelude::*;
use hal::time::Bps;

use squarewave::console::Console;
use squarewave::duty::{Channel, DutyStore};
use squarewave::wave::{Polarity, WaveDriver, TICK_HZ};

type WaveA = hal::gpio::PA0<PullNone, Output<PushPull, LowSpeed>>;
type WaveB = hal::gpio::PA1<PullNone, Output<PushPull, LowSpeed>>;

static STORE: DutyStore = DutyStore::new();
static mut DRIVER: Option<WaveDriver<'static, WaveA, WaveB>> = None;

#[entry]
fn main() -> ! {
    let device = hal::pac::Peripherals::take().unwrap();
    let core = cortex_m::Peripherals::take().unwrap();
    let mut rcc = device.RCC.constrain();
    let mut flash = device.FLASH.constrain();
    let clocks = rcc.cfgr
                    .sysclk(64.mhz())
                    .pclk1(32.mhz())
                    .pclk2(32.mhz())
                    .freeze(&mut flash.acr);
    let gpioa = device.GPIOA.split(&mut rcc.ahb);
    let serial = device.USART2
                       .serial((gpioa.pa2, gpioa.pa15), Bps(115200), clocks);
    let (tx, rx) = serial.split();
    let rx = ClearingRx { rx };

    let mut wave_a = gpioa.pa0.output().pull_type(PullNone);
    let mut wave_b = gpioa.pa1.output().pull_type(PullNone);
    // park both channels at the inactive level until ticking starts
    let _ = wave_a.set_high();
    let _ = wave_b.set_high();
    unsafe {
        DRIVER = Some(WaveDriver::new(&STORE, wave_a, wave_b, Polarity::ActiveLow));
    }

    let mut syst = core.SYST;
    syst_tick_config(&mut syst, clocks.sysclk().0 / TICK_HZ);

    let mut console = Console::new(tx, rx);
    let _ = write!(console, "\x1b[2J");
    let _ = write!(console, "Square wave generator for the STM32F303.\r\n");
    let _ = write!(console, "Check pins PA0 and PA1 with the oscilloscope.\r\n");

    let first = console.prompt_percent("Enter a number between 0 and 100");
    STORE.set(Channel::A, first);
    let _ = write!(console, "The first number you entered was {}\r\n", first);

    let second = console.prompt_percent("Enter another number between 0 and 100");
    STORE.set(Channel::B, second);
    let _ = write!(console, "The second number you entered was {}\r\n", second);

    loop {
        cortex_m::asm::wfi();
    }
}

fn syst_tick_config(syst: &mut cortex_m::peripheral::SYST, ticks: u32) {
    syst.set_reload(ticks - 1);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_interrupt();
    syst.enable_counter();
}

/// Receive side with the latched error flags dropped on the way out. The
/// USART holds ORE/FE/NF until cleared, so a reader that only retries would
/// spin on the same error forever.
struct ClearingRx {
    rx: hal::serial::Rx<hal::pac::USART2>,
}

impl ehal::serial::Read<u8> for ClearingRx {
    type Error = hal::serial::Error;

    fn read(&mut self) -> nb::Result<u8, hal::serial::Error> {
        let result = self.rx.read();
        if let Err(nb::Error::Other(ref e)) = result {
            match e {
                hal::serial::Error::Overrun => {
                    self.rx.clear_overrun_error();
                }
                hal::serial::Error::Framing => {
                    self.rx.clear_framing_error();
                }
                hal::serial::Error::Noise => {
                    self.rx.clear_noise_error();
                }
                _ => {}
            }
        }
        result
    }
}

unsafe fn extract<T>(opt: &'static mut Option<T>) -> &'static mut T {
    match opt {
        Some(ref mut x) => &mut *x,
        None => panic!("extract"),
    }
}

#[exception]
unsafe fn SysTick() {
    let driver = extract(&mut DRIVER);
    driver.tick();
}

#[exception]
unsafe fn HardFault(ef: &ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
