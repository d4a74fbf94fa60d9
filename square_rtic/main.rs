#![no_std]
#![no_main]

#[allow(unused)]
use panic_abort;

use core::fmt::Write;

use rtic::app;

use hal::gpio::{LowSpeed, Output, PullNone, PushPull};
use hal::prelude::*;
use hal::time::Bps;
use heapless::spsc::{Consumer, Producer, Queue};

use squarewave::console::{parse_percent, LineBuf, ParseError};
use squarewave::duty::{Channel, DutyStore};
use squarewave::wave::{Polarity, WaveDriver, TICK_HZ};

type Usart = hal::pac::USART2;
type TxUsart = hal::serial::Tx<Usart>;
type RxUsart = hal::serial::Rx<Usart>;
type WaveA = hal::gpio::PA0<PullNone, Output<PushPull, LowSpeed>>;
type WaveB = hal::gpio::PA1<PullNone, Output<PushPull, LowSpeed>>;

static STORE: DutyStore = DutyStore::new();

fn prompt(
    tx: &mut TxUsart,
    bytes: &mut Consumer<'static, u8, 16>,
    line: &mut LineBuf,
    label: &str,
) -> u8 {
    let _ = write!(tx, "{}\r\n", label);
    loop {
        let b = match bytes.dequeue() {
            Some(b) => b,
            None => continue,
        };
        if b.is_ascii_graphic() || b == b' ' {
            let _ = nb::block!(tx.write(b));
        }
        if let Some(word) = line.push(b) {
            let parsed = parse_percent(word);
            let _ = write!(tx, "\r\n");
            match parsed {
                Ok(percent) => return percent,
                Err(ParseError::OutOfRange) => {
                    let _ = write!(tx, "This is not a number within the acceptable range.\r\n");
                    let _ = write!(tx, "{}\r\n", label);
                }
                Err(ParseError::NotANumber) => {
                    let _ = write!(tx, "This is a character. Please enter a number.\r\n");
                    let _ = write!(tx, "{}\r\n", label);
                }
            }
        }
    }
}

#[app(device = hal::pac, peripherals = true)]
mod app {
    use super::*;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        driver: WaveDriver<'static, WaveA, WaveB>,
        tim: hal::pac::TIM2,
        rx: RxUsart,
        tx: TxUsart,
        producer: Producer<'static, u8, 16>,
        consumer: Consumer<'static, u8, 16>,
    }

    #[init(local = [queue: Queue<u8, 16> = Queue::new()])]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        let device: hal::pac::Peripherals = ctx.device;
        // TIM2 clock gate, before RCC ownership moves into the HAL
        device.RCC.apb1enr.modify(|_, w| w.tim2en().enabled());
        let mut rcc = device.RCC.constrain();
        let mut flash = device.FLASH.constrain();
        let clocks = rcc
            .cfgr
            .sysclk(64.mhz())
            .pclk1(32.mhz())
            .pclk2(32.mhz())
            .freeze(&mut flash.acr);
        let gpioa = device.GPIOA.split(&mut rcc.ahb);
        let mut serial = device
            .USART2
            .serial((gpioa.pa2, gpioa.pa15), Bps(115200), clocks);
        serial.listen(hal::serial::Event::Rxne);
        let (tx, rx) = serial.split();

        let mut wave_a = gpioa.pa0.output().pull_type(PullNone);
        let mut wave_b = gpioa.pa1.output().pull_type(PullNone);
        let _ = wave_a.set_high();
        let _ = wave_b.set_high();
        let driver = WaveDriver::new(&STORE, wave_a, wave_b, Polarity::ActiveLow);

        // APB1 runs at sysclk/2, so the timer kernel clock is pclk1 * 2
        let tim_clk = clocks.pclk1().0 * 2;
        let tim = device.TIM2;
        // 1 MHz counter, one update per tick
        tim.psc.write(|w| unsafe { w.bits(tim_clk / 1_000_000 - 1) });
        tim.arr.write(|w| unsafe { w.bits(1_000_000 / TICK_HZ - 1) });
        // Load PSC and ARR, then drop the update flag the load raised
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.modify(|_, w| w.uif().clear_bit());
        tim.dier.write(|w| w.uie().set_bit());
        tim.cr1.write(|w| w.cen().set_bit());

        let (producer, consumer) = ctx.local.queue.split();
        (
            Shared {},
            Local {
                driver,
                tim,
                rx,
                tx,
                producer,
                consumer,
            },
            init::Monotonics(),
        )
    }

    #[idle(local = [tx, consumer, line: LineBuf = LineBuf::new()])]
    fn idle(ctx: idle::Context) -> ! {
        let tx = ctx.local.tx;
        let bytes = ctx.local.consumer;
        let line = ctx.local.line;

        let _ = write!(tx, "\x1b[2J");
        let _ = write!(tx, "Square wave generator for the STM32F303.\r\n");
        let _ = write!(tx, "Check pins PA0 and PA1 with the oscilloscope.\r\n");

        let first = prompt(tx, bytes, line, "Enter a number between 0 and 100");
        STORE.set(Channel::A, first);
        let _ = write!(tx, "The first number you entered was {}\r\n", first);

        let second = prompt(tx, bytes, line, "Enter another number between 0 and 100");
        STORE.set(Channel::B, second);
        let _ = write!(tx, "The second number you entered was {}\r\n", second);

        loop {
            // configuration is single shot; later input is discarded
            let _ = bytes.dequeue();
        }
    }

    #[task(binds = TIM2, priority = 2, local = [driver, tim])]
    fn tick(ctx: tick::Context) {
        ctx.local.tim.sr.modify(|_, w| w.uif().clear_bit());
        ctx.local.driver.tick();
    }

    #[task(binds = USART2_EXTI26, local = [rx, producer])]
    fn on_rx(ctx: on_rx::Context) {
        let rx = ctx.local.rx;
        match rx.read() {
            Ok(b) => {
                // queue full means idle is behind; drop and let the operator retype
                let _ = ctx.local.producer.enqueue(b);
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => match e {
                hal::serial::Error::Overrun => {
                    rx.clear_overrun_error();
                }
                hal::serial::Error::Framing => {
                    rx.clear_framing_error();
                }
                hal::serial::Error::Noise => {
                    rx.clear_noise_error();
                }
                _ => {}
            },
        }
    }
}
