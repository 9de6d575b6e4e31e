//! Audio stream management
//!
//! Wraps cpal output (and optionally input) streams and delivers
//! non-interleaved blocks to a render callback as a
//! [`lf_core::ProcessContext`]. Input samples cross from the input stream
//! to the output callback through an SPSC ring.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, StreamConfig as CpalStreamConfig};
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};

use lf_core::{ProcessContext, Sample, MAX_IO_CHANNELS};

use crate::{AudioError, AudioResult};

/// Render callback: one non-interleaved block per invocation, on the audio
/// thread. Must not allocate, lock, or panic.
pub type RenderCallback = Box<dyn FnMut(&mut ProcessContext) + Send + 'static>;

/// Stream configuration: rate, block length, channel counts.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub sample_rate: u32,
    /// Preferably a power of two.
    pub block_frames: usize,
    pub num_input: usize,
    pub num_output: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_frames: 256,
            num_input: 0,
            num_output: 2,
        }
    }
}

/// Lock-free stream statistics, readable from any thread.
#[derive(Debug, Default)]
pub struct StreamCounters {
    total_callbacks: AtomicU64,
    xruns: AtomicU64,
}

impl StreamCounters {
    pub fn total_callbacks(&self) -> u64 {
        self.total_callbacks.load(Ordering::Relaxed)
    }

    pub fn xruns(&self) -> u64 {
        self.xruns.load(Ordering::Relaxed)
    }
}

/// Ring carrying interleaved input samples from the input stream to the
/// output callback.
struct InputBridge {
    consumer: Mutex<Consumer<f32>>,
}

/// Audio stream wrapper
pub struct AudioStream {
    output_stream: Option<cpal::Stream>,
    input_stream: Option<cpal::Stream>,
    running: Arc<AtomicBool>,
    counters: Arc<StreamCounters>,
    config: StreamConfig,
}

impl AudioStream {
    /// Open output (and optionally input) streams and bind the render
    /// callback. The stream starts paused; call [`AudioStream::start`].
    pub fn open(
        output_device: &Device,
        input_device: Option<&Device>,
        config: StreamConfig,
        render: RenderCallback,
    ) -> AudioResult<Self> {
        if config.num_output == 0 || config.num_output > MAX_IO_CHANNELS {
            return Err(AudioError::UnsupportedConfig(format!(
                "output channels: {}",
                config.num_output
            )));
        }
        if config.num_input > MAX_IO_CHANNELS {
            return Err(AudioError::UnsupportedConfig(format!(
                "input channels: {}",
                config.num_input
            )));
        }

        let counters = Arc::new(StreamCounters::default());
        let running = Arc::new(AtomicBool::new(false));

        let (input_stream, input_bridge) = match (input_device, config.num_input) {
            (Some(device), n) if n > 0 => {
                let (stream, bridge) = build_input_stream(device, &config, Arc::clone(&counters))?;
                (Some(stream), Some(bridge))
            }
            _ => (None, None),
        };

        let output_stream =
            build_output_stream(output_device, &config, render, input_bridge, &counters)?;

        Ok(Self {
            output_stream: Some(output_stream),
            input_stream,
            running,
            counters,
            config,
        })
    }

    /// Start the audio stream
    pub fn start(&self) -> AudioResult<()> {
        if let Some(stream) = &self.output_stream {
            stream
                .play()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;
        }
        if let Some(stream) = &self.input_stream {
            stream
                .play()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;
        }
        self.running.store(true, Ordering::Release);
        log::info!("audio stream started");
        Ok(())
    }

    /// Stop the audio stream
    pub fn stop(&self) -> AudioResult<()> {
        if let Some(stream) = &self.output_stream {
            stream
                .pause()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;
        }
        if let Some(stream) = &self.input_stream {
            stream
                .pause()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;
        }
        self.running.store(false, Ordering::Release);
        log::info!("audio stream stopped");
        Ok(())
    }

    /// Release the platform streams. The wrapper is inert afterwards.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Release);
        self.output_stream.take();
        self.input_stream.take();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn block_frames(&self) -> usize {
        self.config.block_frames
    }

    pub fn num_input(&self) -> usize {
        self.config.num_input
    }

    pub fn num_output(&self) -> usize {
        self.config.num_output
    }

    /// Lock-free callback/xrun counters.
    pub fn counters(&self) -> Arc<StreamCounters> {
        Arc::clone(&self.counters)
    }
}

fn cpal_config(config: &StreamConfig, channels: usize) -> CpalStreamConfig {
    CpalStreamConfig {
        channels: channels as u16,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size: BufferSize::Fixed(config.block_frames as u32),
    }
}

fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    counters: Arc<StreamCounters>,
) -> AudioResult<(cpal::Stream, Arc<InputBridge>)> {
    // Room for several blocks of interleaved input.
    let ring_len = (config.block_frames * config.num_input * 8).max(1024);
    let (mut producer, consumer): (Producer<f32>, Consumer<f32>) = RingBuffer::new(ring_len);
    let bridge = Arc::new(InputBridge {
        consumer: Mutex::new(consumer),
    });

    let err_counters = Arc::clone(&counters);
    let stream = device
        .build_input_stream(
            &cpal_config(config, config.num_input),
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                for &sample in data {
                    // A full ring drops input; the output side underflows to silence.
                    let _ = producer.push(sample);
                }
            },
            move |err| {
                err_counters.xruns.fetch_add(1, Ordering::Relaxed);
                log::warn!("input stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok((stream, bridge))
}

fn build_output_stream(
    device: &Device,
    config: &StreamConfig,
    mut render: RenderCallback,
    input_bridge: Option<Arc<InputBridge>>,
    counters: &Arc<StreamCounters>,
) -> AudioResult<cpal::Stream> {
    let num_output = config.num_output;

    // Pre-allocated non-interleaved channel buffers, reused per callback.
    let mut in_bufs: Vec<Vec<Sample>> = (0..config.num_input)
        .map(|_| vec![0.0; config.block_frames])
        .collect();
    let mut out_bufs: Vec<Vec<Sample>> = (0..num_output)
        .map(|_| vec![0.0; config.block_frames])
        .collect();

    let cb_counters = Arc::clone(counters);
    let err_counters = Arc::clone(counters);

    let stream = device
        .build_output_stream(
            &cpal_config(config, num_output),
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                cb_counters.total_callbacks.fetch_add(1, Ordering::Relaxed);

                let frames = data.len() / num_output.max(1);
                for buf in in_bufs.iter_mut().chain(out_bufs.iter_mut()) {
                    if buf.len() < frames {
                        buf.resize(frames, 0.0);
                    }
                }

                // Deinterleave captured input, zero-filling on underflow.
                if let Some(bridge) = &input_bridge {
                    let mut consumer = bridge.consumer.lock();
                    for i in 0..frames {
                        for buf in in_bufs.iter_mut() {
                            buf[i] = consumer.pop().unwrap_or(0.0);
                        }
                    }
                } else {
                    for buf in in_bufs.iter_mut() {
                        buf[..frames].fill(0.0);
                    }
                }

                for buf in out_bufs.iter_mut() {
                    buf[..frames].fill(0.0);
                }

                {
                    let in_refs: Vec<&[Sample]> =
                        in_bufs.iter().map(|b| &b[..frames]).collect();
                    let mut out_refs: Vec<&mut [Sample]> =
                        out_bufs.iter_mut().map(|b| &mut b[..frames]).collect();
                    let mut ctx = ProcessContext::new(&in_refs, &mut out_refs, frames);
                    render(&mut ctx);
                }

                // Interleave back into the device buffer.
                for i in 0..frames {
                    for (ch, buf) in out_bufs.iter().enumerate() {
                        data[i * num_output + ch] = buf[i];
                    }
                }
            },
            move |err| {
                err_counters.xruns.fetch_add(1, Ordering::Relaxed);
                log::warn!("output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}
