//! Shared analysis graph: one lazily-created `AudioContext` + `AnalyserNode`,
//! with exactly one producer connected at a time.
//!
//! All mutation goes through the session executor; components only ever read
//! frames. Handles live in thread-local slots because JS objects cannot cross
//! threads and must not sit inside reactive signals.

use std::cell::RefCell;
use std::fmt;

use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AnalyserNode, AudioContext, AudioContextState, HtmlMediaElement, MediaStream,
};

use crate::audio::microphone;
use crate::state::VisMode;

/// Analysis window; the browser exposes `FFT_SIZE / 2` output bins.
pub const FFT_SIZE: u32 = 512;
pub const BIN_COUNT: usize = (FFT_SIZE / 2) as usize;

pub struct GraphError(pub String);

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audio graph error: {}", self.0)
    }
}

struct Graph {
    ctx: AudioContext,
    analyser: AnalyserNode,
}

/// The producer currently feeding the analyser.
enum SourceHandle {
    Microphone {
        node: web_sys::MediaStreamAudioSourceNode,
        stream: MediaStream,
    },
    FileDecoded {
        node: web_sys::MediaElementAudioSourceNode,
    },
}

thread_local! {
    static GRAPH: RefCell<Option<Graph>> = const { RefCell::new(None) };
    static SOURCE: RefCell<Option<SourceHandle>> = const { RefCell::new(None) };
}

/// Idempotent lazy creation of the process-wide audio context.
pub fn ensure() -> Result<(), GraphError> {
    GRAPH.with(|g| {
        let mut slot = g.borrow_mut();
        if slot.is_some() {
            return Ok(());
        }
        let ctx = AudioContext::new()
            .map_err(|e| GraphError(format!("AudioContext refused: {e:?}")))?;
        let analyser = ctx
            .create_analyser()
            .map_err(|e| GraphError(format!("analyser creation failed: {e:?}")))?;
        analyser.set_fft_size(FFT_SIZE);
        log::info!("Audio context ready, {BIN_COUNT} analysis bins");
        *slot = Some(Graph { ctx, analyser });
        Ok(())
    })
}

/// Connect a microphone stream: `source -> analyser` only. Capture input is
/// never routed to the destination; that edge would feed the speakers back
/// into the mic.
pub fn connect_microphone(stream: MediaStream) -> Result<(), GraphError> {
    ensure()?;
    disconnect();
    let connected = GRAPH.with(|g| {
        let slot = g.borrow();
        let graph = slot
            .as_ref()
            .ok_or_else(|| GraphError("context missing after ensure".into()))?;
        let node = graph
            .ctx
            .create_media_stream_source(&stream)
            .map_err(|e| GraphError(format!("stream source failed: {e:?}")))?;
        node.connect_with_audio_node(&graph.analyser)
            .map_err(|e| GraphError(format!("connect failed: {e:?}")))?;
        Ok::<_, GraphError>(node)
    });
    let node = match connected {
        Ok(node) => node,
        Err(e) => {
            // No partial connection: a failed wire-up releases the capture.
            microphone::release(&stream);
            return Err(e);
        }
    };
    SOURCE.with(|s| *s.borrow_mut() = Some(SourceHandle::Microphone { node, stream }));
    log::info!("Microphone connected to analyser");
    Ok(())
}

/// Connect a decoded file: `source -> analyser -> destination`, so uploaded
/// audio is both analysed and audible.
pub fn connect_media_element(element: &HtmlMediaElement) -> Result<(), GraphError> {
    ensure()?;
    disconnect();
    let node = GRAPH.with(|g| {
        let slot = g.borrow();
        let graph = slot
            .as_ref()
            .ok_or_else(|| GraphError("context missing after ensure".into()))?;
        let node = graph
            .ctx
            .create_media_element_source(element)
            .map_err(|e| GraphError(format!("element source failed: {e:?}")))?;
        node.connect_with_audio_node(&graph.analyser)
            .map_err(|e| GraphError(format!("connect failed: {e:?}")))?;
        if let Err(e) = graph
            .analyser
            .connect_with_audio_node(&graph.ctx.destination())
        {
            // No hybrid state: unwind the edge we just made.
            let _ = node.disconnect();
            return Err(GraphError(format!("output routing failed: {e:?}")));
        }
        Ok::<_, GraphError>(node)
    })?;
    SOURCE.with(|s| *s.borrow_mut() = Some(SourceHandle::FileDecoded { node }));
    log::info!("File source connected to analyser and output");
    Ok(())
}

/// Sever the current edge and release the producer behind it. Idempotent.
pub fn disconnect() {
    let Some(handle) = SOURCE.with(|s| s.borrow_mut().take()) else {
        return;
    };
    match handle {
        SourceHandle::Microphone { node, stream } => {
            let _ = node.disconnect();
            microphone::release(&stream);
        }
        SourceHandle::FileDecoded { node } => {
            let _ = node.disconnect();
        }
    }
    // Drop the analyser -> destination edge a file session added.
    GRAPH.with(|g| {
        if let Some(graph) = g.borrow().as_ref() {
            let _ = graph.analyser.disconnect();
        }
    });
    log::info!("Source disconnected");
}

pub fn has_source() -> bool {
    SOURCE.with(|s| s.borrow().is_some())
}

/// Close the context (awaited) and immediately recreate an empty one, leaving
/// the system "ready, no source" rather than uninitialised. A rejected close
/// is logged as an anomaly; recreation proceeds regardless.
pub async fn dispose() {
    disconnect();
    if let Some(graph) = GRAPH.with(|g| g.borrow_mut().take()) {
        match graph.ctx.close() {
            Ok(promise) => {
                if let Err(e) = JsFuture::from(promise).await {
                    log::error!("Audio context close rejected: {e:?}");
                }
            }
            Err(e) => log::error!("Audio context close failed: {e:?}"),
        }
    }
    if let Err(e) = ensure() {
        log::error!("Audio context recreation failed: {e}");
    }
}

/// Read one frame of byte samples from the analyser. The render loop never
/// ticks without a connected source, so a missing graph here is a sequencing
/// bug; the read degrades to a no-op rather than tearing the tick down.
pub fn read_frame(mode: VisMode, buf: &mut [u8]) {
    GRAPH.with(|g| {
        if let Some(graph) = g.borrow().as_ref() {
            match mode {
                VisMode::Spectrum => graph.analyser.get_byte_frequency_data(buf),
                VisMode::Waveform => graph.analyser.get_byte_time_domain_data(buf),
            }
        }
    });
}

/// Autoplay-policy recovery: resume a suspended context on a user gesture.
pub fn resume_if_suspended() {
    GRAPH.with(|g| {
        if let Some(graph) = g.borrow().as_ref() {
            if graph.ctx.state() == AudioContextState::Suspended {
                let _ = graph.ctx.resume();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_count_matches_analysis_window() {
        assert_eq!(BIN_COUNT, 256);
        assert_eq!(FFT_SIZE as usize, BIN_COUNT * 2);
    }

    #[test]
    fn graph_error_display() {
        let e = GraphError("boom".into());
        assert_eq!(e.to_string(), "audio graph error: boom");
    }
}
