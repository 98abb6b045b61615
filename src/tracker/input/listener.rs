use std::sync::Arc;

use anyhow::Result;
use rdev::{listen, Event, EventType};
use tracing::{error, info};

use crate::tracker::{
    accumulator::Accumulator,
    chord::{Key, Modifier, Side},
};

use super::{Button, InputEvent};

/// Starts the system wide keyboard and pointer hook on a dedicated thread. The hook never
/// returns while it works, so the thread lives as long as the process.
pub fn spawn_listener(sink: Arc<Accumulator>) -> Result<()> {
    std::thread::Builder::new()
        .name("input-listener".into())
        .spawn(move || {
            info!("Input listener started");
            let callback = move |event: Event| {
                if let Some(event) = convert_event(event) {
                    sink.record(event);
                }
            };
            if let Err(e) = listen(callback) {
                error!("Input listener stopped {e:?}");
            }
        })?;
    Ok(())
}

fn convert_event(event: Event) -> Option<InputEvent> {
    match event.event_type {
        EventType::KeyPress(key) => Some(InputEvent::KeyPress {
            key: convert_key(key),
            symbol: single_char(event.name.as_deref()),
        }),
        EventType::KeyRelease(key) => Some(InputEvent::KeyRelease {
            key: convert_key(key),
        }),
        EventType::ButtonPress(button) => Some(InputEvent::ButtonPress(convert_button(button))),
        EventType::ButtonRelease(button) => {
            Some(InputEvent::ButtonRelease(convert_button(button)))
        }
        EventType::MouseMove { x, y } => Some(InputEvent::PointerMove { x, y }),
        EventType::Wheel { delta_x, delta_y } => Some(InputEvent::Scroll {
            dx: delta_x as f64,
            dy: delta_y as f64,
        }),
    }
}

fn single_char(name: Option<&str>) -> Option<char> {
    let mut chars = name?.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn convert_button(button: rdev::Button) -> Button {
    match button {
        rdev::Button::Left => Button::Left,
        rdev::Button::Right => Button::Right,
        rdev::Button::Middle => Button::Middle,
        rdev::Button::Unknown(_) => Button::Other,
    }
}

fn convert_key(key: rdev::Key) -> Key {
    use rdev::Key as K;
    let base = match key {
        K::ShiftLeft => return Key::Modifier(Modifier::Shift, Side::Left),
        K::ShiftRight => return Key::Modifier(Modifier::Shift, Side::Right),
        K::ControlLeft => return Key::Modifier(Modifier::Ctrl, Side::Left),
        K::ControlRight => return Key::Modifier(Modifier::Ctrl, Side::Right),
        K::Alt => return Key::Modifier(Modifier::Alt, Side::Left),
        K::AltGr => return Key::Modifier(Modifier::AltGr, Side::Left),
        K::MetaLeft => return Key::Modifier(Modifier::Cmd, Side::Left),
        K::MetaRight => return Key::Modifier(Modifier::Cmd, Side::Right),
        K::Return | K::KpReturn => return Key::named("enter"),
        K::Escape => return Key::named("esc"),
        K::Delete | K::KpDelete => return Key::named("delete"),
        K::UpArrow => return Key::named("up"),
        K::DownArrow => return Key::named("down"),
        K::LeftArrow => return Key::named("left"),
        K::RightArrow => return Key::named("right"),
        K::Space => ' ',
        K::KeyA => 'a',
        K::KeyB => 'b',
        K::KeyC => 'c',
        K::KeyD => 'd',
        K::KeyE => 'e',
        K::KeyF => 'f',
        K::KeyG => 'g',
        K::KeyH => 'h',
        K::KeyI => 'i',
        K::KeyJ => 'j',
        K::KeyK => 'k',
        K::KeyL => 'l',
        K::KeyM => 'm',
        K::KeyN => 'n',
        K::KeyO => 'o',
        K::KeyP => 'p',
        K::KeyQ => 'q',
        K::KeyR => 'r',
        K::KeyS => 's',
        K::KeyT => 't',
        K::KeyU => 'u',
        K::KeyV => 'v',
        K::KeyW => 'w',
        K::KeyX => 'x',
        K::KeyY => 'y',
        K::KeyZ => 'z',
        K::Num0 | K::Kp0 => '0',
        K::Num1 | K::Kp1 => '1',
        K::Num2 | K::Kp2 => '2',
        K::Num3 | K::Kp3 => '3',
        K::Num4 | K::Kp4 => '4',
        K::Num5 | K::Kp5 => '5',
        K::Num6 | K::Kp6 => '6',
        K::Num7 | K::Kp7 => '7',
        K::Num8 | K::Kp8 => '8',
        K::Num9 | K::Kp9 => '9',
        K::BackQuote => '`',
        K::Minus | K::KpMinus => '-',
        K::Equal => '=',
        K::LeftBracket => '[',
        K::RightBracket => ']',
        K::SemiColon => ';',
        K::Quote => '\'',
        K::BackSlash | K::IntlBackslash => '\\',
        K::Comma => ',',
        K::Dot => '.',
        K::Slash | K::KpDivide => '/',
        K::KpPlus => '+',
        K::KpMultiply => '*',
        other => return Key::named(&format!("{other:?}")),
    };
    Key::Char(base)
}
