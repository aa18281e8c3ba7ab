//! DECtalk decoder tests
//!
//! Drives the decoder with raw host bytes and checks what reached the
//! speech back-end and what was sent back to the host.

use rpitalk::mapper::map_range;
use rpitalk::protocol::{
    Decoder, DectalkDecoder, DectalkProfile, DeviceDefaults, Mode, Protocol, MAX_BUFFER_SIZE,
};
use rpitalk::speech::{Punctuation, RecordingBackend, SpeechCommand};

/// Decoder with default settings and a cleared call log
fn decoder(profile: DectalkProfile) -> (DectalkDecoder, RecordingBackend) {
    let backend = RecordingBackend::new();
    let decoder = DectalkDecoder::new(profile, Box::new(backend.clone()), DeviceDefaults::DECTALK);
    backend.clear();
    (decoder, backend)
}

#[test]
fn test_startup_applies_defaults_and_greets() {
    let backend = RecordingBackend::new();
    let decoder = DectalkDecoder::new(
        DectalkProfile::CURRENT,
        Box::new(backend.clone()),
        DeviceDefaults::DECTALK,
    );

    let calls = backend.calls();
    assert_eq!(calls[0], SpeechCommand::SetRate(map_range(400, 75, 650)));
    assert_eq!(calls[1], SpeechCommand::SetPitch(100)); // 200 is above the 50-180 scale
    assert_eq!(calls[2], SpeechCommand::SetVolume(0));
    assert_eq!(backend.spoken(), vec!["Starting RPItalk, version 0.9.".to_string()]);

    assert_eq!(decoder.session().rate, 400);
    assert_eq!(decoder.protocol(), Protocol::Dectalk);
    assert_eq!(decoder.session().mode(), Mode::Idle);
}

#[test]
fn test_absolute_then_relative_rate() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:ra 300]");
    assert_eq!(decoder.session().rate, 300);
    assert_eq!(backend.last(), Some(SpeechCommand::SetRate(-21)));

    decoder.feed(b"[:ra +50]");
    assert_eq!(decoder.session().rate, 350);

    decoder.feed(b"[:ra -100]");
    assert_eq!(decoder.session().rate, 250);
}

#[test]
fn test_raw_value_is_not_clamped() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:ra 600][:ra +200]");
    assert_eq!(decoder.session().rate, 800);
    assert_eq!(backend.last(), Some(SpeechCommand::SetRate(100)));
}

#[test]
fn test_index_flushes_text_and_echoes() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    let response = decoder.feed(b"hello world\x0b");
    assert_eq!(backend.spoken(), vec!["hello world".to_string()]);
    assert_eq!(response, vec![0x0B]);
    assert_eq!(decoder.session().mode(), Mode::Idle);
    assert!(decoder.session().buffer.is_empty());
}

#[test]
fn test_text_split_across_chunks() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    assert!(decoder.feed(b"hel").is_empty());
    assert!(backend.spoken().is_empty());
    decoder.feed(b"lo\x0b");
    assert_eq!(backend.spoken(), vec!["hello".to_string()]);
}

#[test]
fn test_break_cancels_and_acknowledges() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    let response = decoder.feed(b"\x03");
    assert_eq!(response, vec![0x01]);
    assert_eq!(backend.calls(), vec![SpeechCommand::Cancel]);
}

#[test]
fn test_break_still_speaks_pending_text() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"pending\x03");
    assert_eq!(
        backend.calls(),
        vec![
            SpeechCommand::Cancel,
            SpeechCommand::Speak("pending".to_string())
        ]
    );
}

#[test]
fn test_command_start_flushes_literal_first() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"say this[:ra 200]");
    let calls = backend.calls();
    assert_eq!(calls[0], SpeechCommand::Speak("say this".to_string()));
    assert!(matches!(calls[1], SpeechCommand::SetRate(_)));
    assert_eq!(decoder.session().rate, 200);
}

#[test]
fn test_mode_tracks_brackets() {
    let (mut decoder, _backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:ra");
    assert_eq!(decoder.session().mode(), Mode::Command);
    decoder.feed(b" 250");
    assert_eq!(decoder.session().mode(), Mode::Command);
    decoder.feed(b"]");
    assert_eq!(decoder.session().mode(), Mode::Idle);
    assert_eq!(decoder.session().rate, 250);
}

#[test]
fn test_index_inside_command_keeps_command_text() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    let response = decoder.feed(b"[:ra 3\x0b00]");
    assert_eq!(response, vec![0x0B]);
    assert!(backend.spoken().is_empty());
    assert_eq!(decoder.session().rate, 300);
}

#[test]
fn test_multiple_subcommands() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:ra 180 :vo 80:pu all]");
    assert_eq!(decoder.session().rate, 180);
    assert_eq!(decoder.session().volume, 80);
    assert_eq!(decoder.session().punctuation, Some(Punctuation::All));
    assert_eq!(backend.setter_count(), 3);
}

#[test]
fn test_punctuation_letters() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:pu S]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetPunctuation(Punctuation::Some)));
    decoder.feed(b"[:pu n]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetPunctuation(Punctuation::None)));
    decoder.feed(b"[:pu pronounce]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetPunctuation(Punctuation::None)));
}

#[test]
fn test_invalid_punctuation_does_not_stop_stream() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:pu x:ra 200]after\x0b");
    assert_eq!(decoder.session().punctuation, None);
    assert_eq!(decoder.session().rate, 200);
    assert_eq!(backend.spoken(), vec!["after".to_string()]);
}

#[test]
fn test_voice_by_number() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:n6]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetVoice("FEMALE1".to_string())));
    assert_eq!(decoder.session().voice, Some(6));

    decoder.feed(b"[:n0]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetVoice("default".to_string())));
    assert_eq!(decoder.session().voice, Some(0));
}

#[test]
fn test_voice_by_name() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:na paul]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetVoice("MALE1".to_string())));
    assert_eq!(decoder.session().voice, Some(1));

    backend.clear();
    decoder.feed(b"[:na betty]");
    assert!(backend.calls().is_empty());
    assert_eq!(decoder.session().voice, Some(1));
}

#[test]
fn test_pitch_scales_differ_between_profiles() {
    let (mut current, current_backend) = decoder(DectalkProfile::CURRENT);
    current.feed(b"[:dv ap 100]");
    assert_eq!(current_backend.last(), Some(SpeechCommand::SetPitch(-23)));
    assert_eq!(current.session().pitch, 100);

    let (mut legacy, legacy_backend) = decoder(DectalkProfile::LEGACY);
    legacy.feed(b"[:dv ap 100]");
    // Legacy raises the host value by 40 on a 50-200 scale
    assert_eq!(legacy_backend.last(), Some(SpeechCommand::SetPitch(20)));
    assert_eq!(legacy.session().pitch, 100);
    assert_eq!(legacy.protocol(), Protocol::DectalkLegacy);
}

#[test]
fn test_pitch_range_is_percentage() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:dv pr 40]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetPitchRange(40)));
    decoder.feed(b"[:dv pr +10]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetPitchRange(50)));
    decoder.feed(b"[:dv pr 250]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetPitchRange(100)));
    assert_eq!(decoder.session().pitch_range, Some(250));
}

#[test]
fn test_relative_pitch_range_needs_a_value() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:dv pr +10]");
    assert!(backend.calls().is_empty());
    assert_eq!(decoder.session().pitch_range, None);
}

#[test]
fn test_design_voice_g5() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"[:dv g5 +2]");
    assert!(backend.calls().is_empty());

    decoder.feed(b"[:dv g5 70]");
    assert_eq!(backend.last(), Some(SpeechCommand::SetVolume(map_range(70, 60, 86))));
    assert_eq!(decoder.session().g5, Some(70));
    assert_eq!(decoder.session().volume, 50);

    decoder.feed(b"[:dv g5 +2]");
    assert_eq!(decoder.session().g5, Some(72));
}

#[test]
fn test_backend_failure_keeps_previous_value() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    backend.set_failing(true);
    decoder.feed(b"[:ra 300:vo 10:pu a:n3]");
    assert_eq!(decoder.session().rate, 400);
    assert_eq!(decoder.session().volume, 50);
    assert_eq!(decoder.session().punctuation, None);
    assert_eq!(decoder.session().voice, None);

    backend.set_failing(false);
    decoder.feed(b"[:ra +10]");
    assert_eq!(decoder.session().rate, 410);
}

#[test]
fn test_unknown_and_malformed_commands_are_ignored() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    let response = decoder.feed(b"[:xx 5:ra fast:ra:dv zz 3:dv][]");
    assert!(response.is_empty());
    assert!(backend.calls().is_empty());
    assert_eq!(decoder.session().rate, 400);
    assert_eq!(decoder.session().mode(), Mode::Idle);
}

#[test]
fn test_non_printable_bytes_are_dropped() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"a\r\nb\x7f\xffc\x0b");
    assert_eq!(backend.spoken(), vec!["abc".to_string()]);
}

#[test]
fn test_full_buffer_is_spoken_once() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    let text = vec![b'x'; MAX_BUFFER_SIZE];
    decoder.feed(&text);
    let spoken = backend.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].len(), MAX_BUFFER_SIZE);
    assert!(decoder.session().buffer.is_empty());
    assert_eq!(decoder.session().mode(), Mode::Idle);
}

#[test]
fn test_full_buffer_in_command_mode() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    let mut data = vec![b'['];
    data.extend(vec![b'z'; MAX_BUFFER_SIZE]);
    decoder.feed(&data);
    assert_eq!(backend.spoken().len(), 1);
    assert!(decoder.session().buffer.is_empty());
    assert_eq!(decoder.session().mode(), Mode::Command);
}

#[test]
fn test_shutdown_speaks_pending_text() {
    let (mut decoder, backend) = decoder(DectalkProfile::CURRENT);

    decoder.feed(b"last words");
    decoder.shutdown();
    assert_eq!(
        backend.calls(),
        vec![
            SpeechCommand::Speak("last words".to_string()),
            SpeechCommand::Shutdown
        ]
    );
}
