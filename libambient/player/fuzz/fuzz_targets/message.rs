#![no_main]
use libambient_player::ambient_player::{Message, PlaybackState};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|frame: &str| {
    if let Ok(message) = Message::decode(frame) {
        let encoded = message.encode().unwrap();
        assert_eq!(message, Message::decode(&encoded).unwrap());
        if let Message::StateUpdate(state) = message {
            let _ = PlaybackState::default().apply_update(state);
        }
    }
});
