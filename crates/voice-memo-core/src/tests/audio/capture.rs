use crate::{
    RecorderError,
    audio::capture::{
        MAX_METER_SAMPLES, lock_or_recover, open_writer, repair_wav_header, to_pcm16, write_frames,
    },
};

use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{Arc, Mutex},
};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// WHAT: Writing frames caps the meter and writes every frame
/// WHY: Late ticks must not grow the meter buffer without bound
#[test]
#[allow(clippy::unwrap_used)]
fn given_full_meter_when_writing_frames_then_oldest_dropped_and_audio_written() {
    // Given: A meter at capacity and a fresh mono writer
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.wav");
    let mut writer = Some(open_writer(&path, mono_spec(48_000)).unwrap());
    let mut meter = VecDeque::from(vec![0.0f32; MAX_METER_SAMPLES]);

    // When: Writing 1024 stereo frames of (1.0, 0.0)
    let data: Vec<f32> = std::iter::repeat_n([1.0f32, 0.0], 1024).flatten().collect();
    write_frames(&data, 2, 1, &mut meter, &mut writer).unwrap();
    writer.take().unwrap().finalize().unwrap();

    // Then: The meter keeps its cap with the down-mixed frames at the end
    assert_eq!(meter.len(), MAX_METER_SAMPLES);
    assert!((meter[MAX_METER_SAMPLES - 1] - 0.5).abs() < f32::EPSILON);
    assert!((meter[MAX_METER_SAMPLES - 1024] - 0.5).abs() < f32::EPSILON);
    assert!(meter[MAX_METER_SAMPLES - 1025].abs() < f32::EPSILON);

    // And: One mono sample per frame reached the file
    let reader = WavReader::open(&path).unwrap();
    assert_eq!(reader.len(), 1024);
}

/// WHAT: Frames still feed the meter once the writer is gone
/// WHY: Levels keep updating after the file is finalized mid-callback
#[test]
#[allow(clippy::unwrap_used)]
fn given_no_writer_when_writing_frames_then_meter_only() {
    let mut meter = VecDeque::new();
    let mut writer: Option<WavWriter<Cursor<Vec<u8>>>> = None;

    write_frames(&[0.25, 0.75, -0.5], 1, 1, &mut meter, &mut writer).unwrap();

    assert_eq!(meter, VecDeque::from(vec![0.25, 0.75, -0.5]));
}

/// WHAT: Poisoned capture locks are recovered with their data
/// WHY: A panicked audio callback must not drop captured levels
#[test]
#[allow(clippy::unwrap_used, clippy::panic)]
fn given_poisoned_meter_lock_when_locking_then_data_recovered() {
    // Given: A meter lock poisoned by a panicking holder
    let meter = Arc::new(Mutex::new(VecDeque::from(vec![0.5f32; 100])));
    let poisoner = Arc::clone(&meter);
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poison the meter lock");
    })
    .join();
    assert!(meter.is_poisoned());

    // When: Locking through the capture helper
    let recovered = lock_or_recover(&meter, "Meter buffer");

    // Then: The samples are still there
    assert_eq!(recovered.len(), 100);
    assert!(recovered.iter().all(|&s| (s - 0.5).abs() < f32::EPSILON));
}

/// WHAT: A file from a killed process keeps its audio when appended to
/// WHY: The header of an unfinalized WAV still claims zero samples
#[test]
#[allow(clippy::unwrap_used)]
fn given_unfinalized_wav_when_reopening_writer_then_old_and_new_samples_kept() {
    // Given: A writer that wrote a second of audio and was never finalized
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_20240616140322.wav");
    let mut writer = open_writer(&path, mono_spec(44_100)).unwrap();
    for _ in 0..44_100 {
        writer.write_sample(to_pcm16(0.25)).unwrap();
    }
    std::mem::forget(writer);
    assert_eq!(WavReader::open(&path).unwrap().len(), 0);

    // When: Repairing the header, then appending 50 samples
    let survived = repair_wav_header(&path).unwrap() / 2;
    let mut writer = open_writer(&path, mono_spec(44_100)).unwrap();
    for _ in 0..50 {
        writer.write_sample(to_pcm16(-0.5)).unwrap();
    }
    writer.finalize().unwrap();

    // Then: The surviving audio is followed by the new samples
    assert!(survived > 0);
    let mut reader = WavReader::open(&path).unwrap();
    assert_eq!(u64::from(reader.len()), survived + 50);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples[0], to_pcm16(0.25));
    assert_eq!(samples[samples.len() - 51], to_pcm16(0.25));
    assert_eq!(samples[samples.len() - 50], to_pcm16(-0.5));
}

/// WHAT: Repairing a file that is not a WAV fails
/// WHY: A foreign file must never be rewritten
#[test]
#[allow(clippy::unwrap_used)]
fn given_non_wav_file_when_repairing_then_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, b"just some text, not audio").unwrap();

    let result = repair_wav_header(&path);

    assert!(matches!(result, Err(RecorderError::IoFailure { .. })));
    assert_eq!(
        std::fs::read(&path).unwrap(),
        b"just some text, not audio"
    );
}

/// WHAT: Float samples convert to clamped 16-bit PCM
/// WHY: Out-of-range input must saturate instead of wrapping
#[test]
fn given_out_of_range_samples_when_converting_then_saturates() {
    assert_eq!(to_pcm16(0.0), 0);
    assert_eq!(to_pcm16(1.0), i16::MAX);
    assert_eq!(to_pcm16(2.5), i16::MAX);
    assert_eq!(to_pcm16(-3.0), -i16::MAX);
}

/// WHAT: Reopening an existing WAV appends instead of truncating
/// WHY: A restored recording resumes into the same file
#[test]
#[allow(clippy::unwrap_used)]
fn given_existing_wav_when_opening_writer_then_appends() {
    // Given: A WAV file holding 100 samples
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_20240616140322.wav");
    let mut writer = open_writer(&path, mono_spec(44_100)).unwrap();
    for _ in 0..100 {
        writer.write_sample(to_pcm16(0.25)).unwrap();
    }
    writer.finalize().unwrap();

    // When: Opening it again and writing 50 more samples
    let mut writer = open_writer(&path, mono_spec(44_100)).unwrap();
    for _ in 0..50 {
        writer.write_sample(to_pcm16(0.25)).unwrap();
    }
    writer.finalize().unwrap();

    // Then: The file holds all 150 samples
    let reader = WavReader::open(&path).unwrap();
    assert_eq!(reader.len(), 150);
    assert_eq!(reader.spec().sample_rate, 44_100);
}

/// WHAT: Appending with a different sample rate is refused
/// WHY: Mixing rates in one file would corrupt playback speed
#[test]
#[allow(clippy::unwrap_used)]
fn given_existing_wav_with_other_rate_when_opening_writer_then_device_unavailable() {
    // Given: A 44.1kHz WAV file with audio in it
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording_20240616140322.wav");
    let mut writer = open_writer(&path, mono_spec(44_100)).unwrap();
    writer.write_sample(0i16).unwrap();
    writer.finalize().unwrap();

    // When: Reopening it for 48kHz capture
    let result = open_writer(&path, mono_spec(48_000));

    // Then: The append is rejected
    assert!(matches!(
        result,
        Err(RecorderError::DeviceUnavailable { .. })
    ));
}

/// WHAT: Real microphone capture produces a playable WAV
/// WHY: Exercises the cpal stream and hound writer end to end
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
#[allow(clippy::unwrap_used)]
fn given_default_microphone_when_capturing_briefly_then_wav_has_samples() {
    use crate::{AudioFormat, CaptureBackend, CaptureHandle, CpalCaptureBackend};

    // Given: The default input device and a temp destination
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("capture.wav");
    let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut backend = CpalCaptureBackend::new(None, events_tx);

    // When: Capturing for half a second
    let mut handle = backend
        .acquire(&destination, &AudioFormat::default(), uuid::Uuid::new_v4())
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(500));
    let metered = handle.drain_meter();
    handle.stop().unwrap();

    // Then: The meter saw audio and the file holds samples
    assert!(!metered.is_empty());
    let reader = WavReader::open(&destination).unwrap();
    assert!(reader.len() > 0);
}
