//! Fuzz target: `ButtonRecognizer`
//!
//! Drives arbitrary press / release / tick sequences and verifies:
//! - No panics, including saturated hold times
//! - Within one press, crossed steps strictly climb the ladder
//! - Every release follows a `Wake` and reports the last step crossed
//!
//! cargo fuzz run fuzz_gesture_ladder

#![no_main]

use std::cell::RefCell;

use libfuzzer_sys::fuzz_target;
use sensebe::drivers::button::{ButtonRecognizer, GestureLadder, GestureStep};
use sensebe::events::{Message, MessageSink};

#[derive(Default)]
struct Recorder(RefCell<Vec<Message>>);

impl MessageSink for Recorder {
    fn post(&self, msg: Message) -> bool {
        self.0.borrow_mut().push(msg);
        true
    }
}

fn rank(step: GestureStep) -> u8 {
    match step {
        GestureStep::Wake => 0,
        GestureStep::Quick => 1,
        GestureStep::Short => 2,
        GestureStep::Long => 3,
        GestureStep::Runaway => 4,
    }
}

fuzz_target!(|data: &[u8]| {
    let button = ButtonRecognizer::new(GestureLadder::DEFAULT);
    let sink = Recorder::default();

    for chunk in data.chunks(4) {
        match chunk[0] % 4 {
            0 => button.on_edge(true, u32::from(chunk.get(1).copied().unwrap_or(0)) * 100, &sink),
            1 => button.on_edge(false, 0, &sink),
            2 => {
                let ms = chunk.iter().skip(1).fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                button.on_tick(ms.saturating_mul(16), &sink);
            }
            _ => {
                button.on_tick(u32::MAX, &sink);
            }
        }
    }

    let mut last: Option<GestureStep> = None;
    for msg in sink.0.borrow().iter() {
        match *msg {
            Message::GestureCross(GestureStep::Wake) => {
                assert!(last.is_none(), "wake inside an open press");
                last = Some(GestureStep::Wake);
            }
            Message::GestureCross(step) => {
                let prev = last.expect("cross outside a press");
                assert!(rank(step) > rank(prev), "{:?} after {:?}", step, prev);
                last = Some(step);
            }
            Message::GestureRelease(step) => {
                assert_eq!(Some(step), last.take(), "release must report last crossed step");
            }
            _ => unreachable!(),
        }
    }
});
