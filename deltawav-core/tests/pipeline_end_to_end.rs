use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::thread;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use deltawav_core::engine::{AssemblerConfig, DecodePolicy, PipelineConfig, Session};
use deltawav_core::source::{event_channel, SseEventReader, VecSource};
use deltawav_core::wav::{self, HEADER_LEN};
use deltawav_core::{AudioFormat, ErrorKind, PcmBuffer, StreamEvent};

fn delta(bytes: &[u8]) -> StreamEvent {
    StreamEvent::new(
        "conversation.audio.delta",
        format!(
            r#"{{"id":"msg-1","conversation_id":"conv-1","content":"{}"}}"#,
            BASE64.encode(bytes)
        ),
    )
}

fn done() -> StreamEvent {
    StreamEvent::new("done", "\"[DONE]\"")
}

fn lenient_session() -> Session {
    Session::new(PipelineConfig {
        assembler: AssemblerConfig {
            decode_policy: DecodePolicy::Lenient,
            ..AssemblerConfig::default()
        },
        format: AudioFormat::default(),
    })
}

fn read_back(path: &Path) -> PcmBuffer {
    let bytes = fs::read(path).expect("read WAV");
    let (format, pcm) = wav::read_pcm(Cursor::new(bytes)).expect("parse WAV");
    assert_eq!(format, AudioFormat::default());
    pcm
}

#[test]
fn round_trip_reproduces_concatenated_fragments() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");
    let fragments: Vec<Vec<u8>> = vec![
        (0u8..10).collect(),
        vec![0xAA; 6],
        (100u8..132).collect(),
    ];
    let mut events: Vec<StreamEvent> = fragments.iter().map(|f| delta(f)).collect();
    events.push(done());

    let outcome = Session::default()
        .run_to_path(&mut VecSource::new(events), &out)
        .unwrap();

    let expected: Vec<u8> = fragments.concat();
    assert_eq!(outcome.pcm_bytes, expected.len());
    assert_eq!(read_back(&out).into_bytes(), expected);

    let reader = hound::WavReader::open(&out).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, expected.len() / 2);
}

#[test]
fn terminal_only_stream_writes_empty_data_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("silence.wav");

    let outcome = Session::default()
        .run_to_path(&mut VecSource::new([done()]), &out)
        .unwrap();

    assert_eq!(outcome.pcm_bytes, 0);
    assert_eq!(outcome.duration_secs, 0.0);
    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes.len(), HEADER_LEN);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(&bytes[40..44], &[0, 0, 0, 0]);
    assert!(read_back(&out).is_empty());
}

#[test]
fn single_ab_fragment_gives_two_byte_data_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ab.wav");

    Session::default()
        .run_to_path(&mut VecSource::new([delta(b"AB"), done()]), &out)
        .unwrap();

    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes.len(), HEADER_LEN + 2);
    assert_eq!(&bytes[40..44], &2u32.to_le_bytes());
    assert_eq!(&bytes[HEADER_LEN..], b"AB");
}

#[test]
fn encoding_twice_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.wav");
    let second = dir.path().join("b.wav");
    let pcm = PcmBuffer::from((0..4800).map(|i| (i % 251) as u8).collect::<Vec<_>>());

    wav::encode_to_path(&pcm, &AudioFormat::default(), &first).unwrap();
    wav::encode_to_path(&pcm, &AudioFormat::default(), &second).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn strict_mode_bad_base64_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");
    let events = vec![
        delta(&[1, 2]),
        StreamEvent::new("conversation.audio.delta", r#"{"content":"***"}"#),
        delta(&[3, 4]),
        done(),
    ];

    let err = Session::default()
        .run_to_path(&mut VecSource::new(events), &out)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.event_index(), Some(1));
    assert!(!out.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn lenient_mode_bad_base64_skips_only_that_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");
    let events = vec![
        delta(&[1, 2]),
        StreamEvent::new("conversation.audio.delta", r#"{"content":"***"}"#),
        delta(&[3, 4]),
        done(),
    ];

    let outcome = lenient_session()
        .run_to_path(&mut VecSource::new(events), &out)
        .unwrap();

    assert_eq!(outcome.report.skipped_events, vec![1]);
    assert_eq!(read_back(&out).as_bytes(), &[1, 2, 3, 4]);
}

#[test]
fn odd_total_length_is_format_error_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");

    let err = Session::default()
        .run_to_path(&mut VecSource::new([delta(&[1, 2, 3]), done()]), &out)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(!out.exists());
}

#[test]
fn failed_run_keeps_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");
    fs::write(&out, b"older take").unwrap();

    let err = Session::default()
        .run_to_path(&mut VecSource::new([delta(&[1, 2])]), &out)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Stream);
    assert_eq!(fs::read(&out).unwrap(), b"older take");
}

#[test]
fn sse_capture_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");
    let capture = format!(
        "event:conversation.chat.created\ndata:{{\"id\":\"c1\"}}\n\n\
         event:conversation.audio.delta\ndata:{{\"content\":\"{}\"}}\n\n\
         : keep-alive\n\n\
         event:conversation.audio.delta\ndata:{{\"content\":\"{}\"}}\n\n\
         event:conversation.chat.completed\ndata:{{}}\n\n\
         event:done\ndata:\"[DONE]\"\n\n",
        BASE64.encode([0x01, 0x00, 0x02, 0x00]),
        BASE64.encode([0xFF, 0x7F]),
    );

    let mut source = SseEventReader::new(Cursor::new(capture.into_bytes()));
    let outcome = Session::default().run_to_path(&mut source, &out).unwrap();

    assert_eq!(outcome.report.fragments_appended, 2);
    assert_eq!(outcome.report.ignored_events, 2);
    let samples: Vec<i16> = read_back(&out).samples_i16().collect();
    assert_eq!(samples, vec![1, 2, i16::MAX]);
}

#[test]
fn channel_fed_transport_thread() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");
    let (tx, mut source) = event_channel(Some(2));

    let producer = thread::spawn(move || {
        for chunk in [[1u8, 0], [2, 0], [3, 0]] {
            tx.send(Ok(delta(&chunk))).unwrap();
            thread::sleep(Duration::from_millis(2));
        }
        tx.send(Ok(done())).unwrap();
    });

    let outcome = Session::default().run_to_path(&mut source, &out).unwrap();
    producer.join().unwrap();

    assert_eq!(outcome.pcm_bytes, 6);
    let samples: Vec<i16> = read_back(&out).samples_i16().collect();
    assert_eq!(samples, vec![1, 2, 3]);
}

#[tokio::test]
async fn async_run_uses_blocking_pool() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reply.wav");
    let source = VecSource::new([delta(&[4, 0, 5, 0]), done()]);

    let outcome = Session::default()
        .run_to_path_async(source, out.clone())
        .await
        .unwrap();

    assert_eq!(outcome.pcm_bytes, 4);
    assert!((outcome.duration_secs - 4.0 / 48_000.0).abs() < 1e-12);
    assert_eq!(read_back(&out).as_bytes(), &[4, 0, 5, 0]);
}
