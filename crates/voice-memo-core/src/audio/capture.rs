use crate::{
    CoreResult, RecorderError,
    audio::{AudioFormat, CaptureBackend, CaptureHandle, DeviceEvent},
};

use std::{
    collections::VecDeque,
    fs::{File, OpenOptions},
    io::{self, BufWriter, Read, Seek, SeekFrom, Write},
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        {Arc, Mutex, MutexGuard},
    },
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Maximum samples held for metering between two ticks (1 second at 48kHz).
/// Older samples are dropped when ticks are late.
pub(crate) const MAX_METER_SAMPLES: usize = 48_000;

type SharedWriter = Arc<Mutex<Option<WavWriter<BufWriter<File>>>>>;

/// Capture backend backed by a `cpal` input stream writing 16-bit WAV via `hound`.
pub struct CpalCaptureBackend {
    device_name: Option<String>,
    events: mpsc::UnboundedSender<DeviceEvent>,
}

impl CpalCaptureBackend {
    /// Creates a backend for the named input device, or the default one when `None`.
    ///
    /// Stream failures are reported on `events`.
    pub fn new(device_name: Option<String>, events: mpsc::UnboundedSender<DeviceEvent>) -> Self {
        Self {
            device_name,
            events,
        }
    }

    #[track_caller]
    #[allow(deprecated)]
    fn find_device(&self) -> CoreResult<Device> {
        let host = cpal::default_host();

        let Some(wanted) = self.device_name.as_deref() else {
            return host
                .default_input_device()
                .ok_or(RecorderError::DeviceUnavailable {
                    reason: "No microphone found".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
        };

        let devices = host
            .input_devices()
            .map_err(|e| RecorderError::DeviceUnavailable {
                reason: format!("Failed to enumerate input devices: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        for device in devices {
            if device.name().map(|name| name == wanted).unwrap_or(false) {
                return Ok(device);
            }
        }

        Err(RecorderError::DeviceUnavailable {
            reason: format!("Input device {:?} not found", wanted),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

impl CaptureBackend for CpalCaptureBackend {
    #[track_caller]
    #[instrument(skip(self))]
    fn acquire(
        &mut self,
        destination: &Path,
        format: &AudioFormat,
        session_id: Uuid,
    ) -> CoreResult<Box<dyn CaptureHandle>> {
        let device = self.find_device()?;

        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| RecorderError::DeviceUnavailable {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .into();

        let device_rate = config.sample_rate;
        let device_channels = usize::from(config.channels.max(1));
        let out_channels = format.channels.clamp(1, config.channels.max(1));

        if device_rate != format.sample_rate {
            warn!(
                requested = format.sample_rate,
                actual = device_rate,
                "Requested sample rate differs from device, recording at device rate"
            );
        }

        let spec = WavSpec {
            channels: out_channels,
            sample_rate: device_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer: SharedWriter = Arc::new(Mutex::new(Some(open_writer(destination, spec)?)));
        let meter = Arc::new(Mutex::new(VecDeque::with_capacity(MAX_METER_SAMPLES)));
        let paused = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        let stream = {
            let writer = Arc::clone(&writer);
            let meter = Arc::clone(&meter);
            let paused = Arc::clone(&paused);
            let shutdown = Arc::clone(&shutdown);
            let write_failed = Arc::clone(&failed);
            let stream_failed = Arc::clone(&failed);
            let write_events = self.events.clone();
            let stream_events = self.events.clone();

            device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        // Paused or stopping: keep the stream alive but write nothing.
                        if paused.load(Ordering::Acquire) || shutdown.load(Ordering::Acquire) {
                            return;
                        }

                        let mut meter = lock_or_recover(&meter, "Meter buffer");
                        let mut writer = lock_or_recover(&writer, "WAV writer");

                        let written = write_frames(
                            data,
                            device_channels,
                            out_channels,
                            &mut *meter,
                            &mut *writer,
                        );

                        if let Err(e) = written
                            && !write_failed.swap(true, Ordering::AcqRel)
                        {
                            error!("Failed to write audio sample: {}", e);
                            let _ = write_events.send(DeviceEvent::Finished {
                                session_id,
                                successful: false,
                            });
                        }
                    },
                    move |err| {
                        error!("Audio stream error: {}", err);
                        if !stream_failed.swap(true, Ordering::AcqRel) {
                            let _ = stream_events.send(DeviceEvent::Finished {
                                session_id,
                                successful: false,
                            });
                        }
                    },
                    None,
                )
                .map_err(|e| RecorderError::DeviceUnavailable {
                    reason: format!("Failed to build stream: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?
        };

        stream.play().map_err(|e| RecorderError::DeviceUnavailable {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            destination = ?destination,
            session_id = %session_id,
            sample_rate = device_rate,
            channels = out_channels,
            "Audio capture started"
        );

        Ok(Box::new(CpalCaptureHandle {
            stream: Some(stream),
            writer,
            meter,
            paused,
            shutdown,
            destination: destination.to_path_buf(),
        }))
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn repair(&mut self, destination: &Path) -> CoreResult<()> {
        let data_len = repair_wav_header(destination)?;
        info!(data_len, "Recording header repaired");
        Ok(())
    }
}

struct CpalCaptureHandle {
    stream: Option<Stream>,
    writer: SharedWriter,
    meter: Arc<Mutex<VecDeque<f32>>>,
    paused: Arc<AtomicBool>,
    /// Set before the stream is dropped so an in-flight callback cannot
    /// write after the writer is finalized.
    shutdown: Arc<AtomicBool>,
    destination: PathBuf,
}

impl CaptureHandle for CpalCaptureHandle {
    fn pause(&mut self) -> CoreResult<()> {
        self.paused.store(true, Ordering::Release);
        debug!("Audio capture paused");
        Ok(())
    }

    fn resume(&mut self) -> CoreResult<()> {
        self.paused.store(false, Ordering::Release);
        debug!("Audio capture resumed");
        Ok(())
    }

    fn drain_meter(&mut self) -> Vec<f32> {
        lock_or_recover(&self.meter, "Meter buffer").drain(..).collect()
    }

    #[track_caller]
    fn sync(&mut self) -> CoreResult<()> {
        if let Some(writer) = lock_or_recover(&self.writer, "WAV writer").as_mut() {
            writer
                .flush()
                .map_err(|e| wav_error(&self.destination, e))?;
        }

        Ok(())
    }

    #[track_caller]
    #[instrument(skip(self), fields(destination = ?self.destination))]
    fn stop(mut self: Box<Self>) -> CoreResult<()> {
        self.shutdown.store(true, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            drop(stream);
            // Lets a final callback observe the shutdown flag on backends
            // whose drop returns before the audio thread joins.
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let writer = lock_or_recover(&self.writer, "WAV writer").take();

        if let Some(writer) = writer {
            writer
                .finalize()
                .map_err(|e| wav_error(&self.destination, e))?;
        }

        info!("Audio capture stopped");

        Ok(())
    }
}

#[track_caller]
pub(crate) fn open_writer(destination: &Path, spec: WavSpec) -> CoreResult<WavWriter<BufWriter<File>>> {
    let has_audio = std::fs::metadata(destination)
        .map(|m| m.len() > 0)
        .unwrap_or(false);

    if !has_audio {
        return WavWriter::create(destination, spec).map_err(|e| wav_error(destination, e));
    }

    // The header of a file from a killed process may still claim no audio.
    repair_wav_header(destination)?;

    let writer = WavWriter::append(destination).map_err(|e| wav_error(destination, e))?;
    let existing = writer.spec();
    if existing.sample_rate != spec.sample_rate || existing.channels != spec.channels {
        return Err(RecorderError::DeviceUnavailable {
            reason: format!(
                "Cannot append {}Hz/{}ch capture to {}Hz/{}ch file",
                spec.sample_rate, spec.channels, existing.sample_rate, existing.channels
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    debug!(destination = ?destination, "Appending to existing recording");
    Ok(writer)
}

/// Writes one callback's worth of interleaved samples and feeds the meter.
///
/// Frames are down-mixed to mono for the meter, which keeps at most
/// [`MAX_METER_SAMPLES`] samples by dropping the oldest. Writing stops at the
/// first failed sample; metering continues.
pub(crate) fn write_frames<W: Write + Seek>(
    data: &[f32],
    device_channels: usize,
    out_channels: u16,
    meter: &mut VecDeque<f32>,
    writer: &mut Option<WavWriter<W>>,
) -> Result<(), hound::Error> {
    let mut written = Ok(());

    for frame in data.chunks(device_channels.max(1)) {
        let mono = frame.iter().sum::<f32>() / frame.len() as f32;
        meter.push_back(mono);

        match writer.as_mut() {
            Some(w) if written.is_ok() => written = write_frame(w, frame, mono, out_channels),
            _ => {}
        }
    }

    while meter.len() > MAX_METER_SAMPLES {
        meter.pop_front();
    }

    written
}

fn write_frame<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    frame: &[f32],
    mono: f32,
    out_channels: u16,
) -> Result<(), hound::Error> {
    if out_channels == 1 {
        return writer.write_sample(to_pcm16(mono));
    }

    frame
        .iter()
        .take(usize::from(out_channels))
        .try_for_each(|&s| writer.write_sample(to_pcm16(s)))
}

/// Locks `mutex`, taking the data back from a poisoned lock.
pub(crate) fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        error!("{} lock poisoned, recovering: {}", what, e);
        e.into_inner()
    })
}

/// Rewrites the RIFF and data chunk sizes of a WAV file from its length on disk.
///
/// Returns the audio byte count now declared. A trailing partial frame is cut off.
#[track_caller]
pub(crate) fn repair_wav_header(path: &Path) -> CoreResult<u64> {
    rewrite_chunk_sizes(path).map_err(|e| RecorderError::io(path, e))
}

fn rewrite_chunk_sizes(path: &Path) -> io::Result<u64> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let file_len = file.metadata()?.len();

    let mut riff = [0u8; 12];
    file.read_exact(&mut riff)?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(invalid_wav("not a RIFF/WAVE file"));
    }

    let mut block_align = 1u64;

    loop {
        let mut header = [0u8; 8];
        file.read_exact(&mut header)?;
        let size = u64::from(u32::from_le_bytes([header[4], header[5], header[6], header[7]]));
        let body = file.stream_position()?;

        match &header[0..4] {
            b"fmt " => {
                let mut fmt = [0u8; 16];
                file.read_exact(&mut fmt)?;
                block_align = u64::from(u16::from_le_bytes([fmt[12], fmt[13]])).max(1);
            }
            b"data" => {
                let available = file_len.saturating_sub(body);
                let data_len = available - available % block_align;
                let data_size =
                    u32::try_from(data_len).map_err(|_| invalid_wav("data chunk exceeds 4 GiB"))?;
                let riff_size = u32::try_from(body + data_len - 8)
                    .map_err(|_| invalid_wav("file exceeds 4 GiB"))?;

                file.set_len(body + data_len)?;
                file.seek(SeekFrom::Start(body - 4))?;
                file.write_all(&data_size.to_le_bytes())?;
                file.seek(SeekFrom::Start(4))?;
                file.write_all(&riff_size.to_le_bytes())?;
                file.sync_all()?;

                return Ok(data_len);
            }
            _ => {}
        }

        // Chunks are padded to an even length.
        file.seek(SeekFrom::Start(body + size + size % 2))?;
    }
}

fn invalid_wav(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.to_string())
}

#[track_caller]
fn wav_error(path: &Path, err: hound::Error) -> RecorderError {
    match err {
        hound::Error::IoError(source) => RecorderError::io(path, source),
        other => RecorderError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        ),
    }
}

pub(crate) fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}
