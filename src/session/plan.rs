//! Pure transition planning for the session controller.
//!
//! Every user intent is turned into an ordered list of teardown/acquisition
//! steps before anything touches the audio graph or the DOM. The executor in
//! `session::mod` carries the steps out in order; the ordering rules that keep
//! teardown safe (render loop stopped before the graph edge is severed, the
//! edge severed before the producer is released) are properties of the plans
//! themselves and are tested here without a browser.

/// Session phase. `Idle` covers both "nothing ever connected" and
/// "file selected but not yet connectable".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    MicActive,
    FileActive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    ToggleMicrophone,
    LoadFile,
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Cancel the outstanding animation handle. Always first: the tick must
    /// never read from a node that is being torn down.
    StopRenderLoop,
    /// Sever the graph edge and release the producer behind it (stopping mic
    /// tracks). Idempotent.
    DisconnectSource,
    /// Pause the media element, drop its listeners, revoke its object URL.
    /// The session slot is `take`n, so the URL is revoked at most once.
    ReleaseFileSession,
    ClearCanvas,
    ClearTransport,
    ClearFileInput,
    ClearStatus,
    /// Async: close the audio context, await it, recreate a fresh one.
    DisposeContext,
    /// Async: permission-gated microphone acquisition, then connect.
    AcquireMicrophone,
    /// Build a new file session (media element + object URL); connection
    /// happens later, on the element's `canplay`.
    BeginFileLoad,
}

impl Step {
    /// Steps that suspend; plans place at most one, and only at the end.
    pub fn is_async(self) -> bool {
        matches!(self, Step::DisposeContext | Step::AcquireMicrophone)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
    /// Phase once the synchronous steps have run. Acquisition steps move the
    /// phase further only when they succeed.
    pub phase_after: Phase,
}

pub fn plan(phase: Phase, intent: Intent) -> Plan {
    use Step::*;
    match intent {
        Intent::ToggleMicrophone => match phase {
            Phase::MicActive => Plan {
                steps: vec![StopRenderLoop, DisconnectSource, ClearStatus],
                phase_after: Phase::Idle,
            },
            // A file session may exist even in Idle (load still in flight);
            // releasing it is a no-op otherwise.
            Phase::Idle | Phase::FileActive => Plan {
                steps: vec![
                    StopRenderLoop,
                    DisconnectSource,
                    ReleaseFileSession,
                    ClearTransport,
                    AcquireMicrophone,
                ],
                phase_after: Phase::Idle,
            },
        },
        Intent::LoadFile => Plan {
            steps: vec![
                StopRenderLoop,
                DisconnectSource,
                ReleaseFileSession,
                ClearTransport,
                BeginFileLoad,
            ],
            phase_after: Phase::Idle,
        },
        Intent::Reset => Plan {
            steps: vec![
                StopRenderLoop,
                DisconnectSource,
                ReleaseFileSession,
                ClearCanvas,
                ClearTransport,
                ClearFileInput,
                ClearStatus,
                DisposeContext,
            ],
            phase_after: Phase::Idle,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Intent::*;
    use Phase::*;
    use Step::*;

    const PHASES: [Phase; 3] = [Idle, MicActive, FileActive];
    const INTENTS: [Intent; 3] = [ToggleMicrophone, LoadFile, Reset];

    fn position(steps: &[Step], step: Step) -> Option<usize> {
        steps.iter().position(|&s| s == step)
    }

    fn assert_before(steps: &[Step], a: Step, b: Step) {
        let (pa, pb) = (position(steps, a), position(steps, b));
        if let (Some(pa), Some(pb)) = (pa, pb) {
            assert!(pa < pb, "{a:?} must precede {b:?} in {steps:?}");
        }
    }

    #[test]
    fn loop_stops_before_graph_disconnect_everywhere() {
        for phase in PHASES {
            for intent in INTENTS {
                let p = plan(phase, intent);
                assert_before(&p.steps, StopRenderLoop, DisconnectSource);
            }
        }
    }

    #[test]
    fn graph_disconnect_precedes_producer_teardown() {
        for phase in PHASES {
            for intent in INTENTS {
                let p = plan(phase, intent);
                assert_before(&p.steps, DisconnectSource, ReleaseFileSession);
                assert_before(&p.steps, DisconnectSource, DisposeContext);
            }
        }
    }

    #[test]
    fn teardown_completes_before_any_acquisition() {
        for phase in PHASES {
            for intent in INTENTS {
                let p = plan(phase, intent);
                for acquisition in [AcquireMicrophone, BeginFileLoad] {
                    assert_before(&p.steps, StopRenderLoop, acquisition);
                    assert_before(&p.steps, DisconnectSource, acquisition);
                    assert_before(&p.steps, ReleaseFileSession, acquisition);
                }
            }
        }
    }

    #[test]
    fn at_most_one_async_step_and_only_last() {
        for phase in PHASES {
            for intent in INTENTS {
                let p = plan(phase, intent);
                let async_count = p.steps.iter().filter(|s| s.is_async()).count();
                assert!(async_count <= 1, "{phase:?}/{intent:?}: {:?}", p.steps);
                if async_count == 1 {
                    assert!(p.steps.last().copied().map(Step::is_async).unwrap_or(false));
                }
            }
        }
    }

    #[test]
    fn file_session_released_at_most_once_per_plan() {
        for phase in PHASES {
            for intent in INTENTS {
                let p = plan(phase, intent);
                let n = p.steps.iter().filter(|&&s| s == ReleaseFileSession).count();
                assert!(n <= 1, "{phase:?}/{intent:?} releases the session {n} times");
            }
        }
    }

    #[test]
    fn mic_toggle_off_is_pure_teardown() {
        let p = plan(MicActive, ToggleMicrophone);
        assert_eq!(p.phase_after, Idle);
        assert!(!p.steps.contains(&AcquireMicrophone));
        assert!(!p.steps.contains(&BeginFileLoad));
        assert!(p.steps.contains(&ClearStatus));
    }

    #[test]
    fn mic_start_from_file_tears_file_down_first() {
        let p = plan(FileActive, ToggleMicrophone);
        assert!(p.steps.contains(&ReleaseFileSession));
        assert_eq!(p.steps.last(), Some(&AcquireMicrophone));
    }

    #[test]
    fn load_file_replaces_any_prior_session() {
        for phase in PHASES {
            let p = plan(phase, LoadFile);
            assert!(p.steps.contains(&ReleaseFileSession));
            assert_eq!(p.steps.last(), Some(&BeginFileLoad));
            assert_eq!(p.phase_after, Idle);
        }
    }

    #[test]
    fn reset_from_any_phase_ends_idle_with_full_teardown() {
        for phase in PHASES {
            let p = plan(phase, Reset);
            assert_eq!(p.phase_after, Idle);
            for required in [
                StopRenderLoop,
                DisconnectSource,
                ReleaseFileSession,
                ClearCanvas,
                ClearTransport,
                ClearFileInput,
                ClearStatus,
                DisposeContext,
            ] {
                assert!(p.steps.contains(&required), "{phase:?}: missing {required:?}");
            }
            assert_eq!(p.steps.last(), Some(&DisposeContext));
        }
    }

    #[test]
    fn no_plan_connects_without_disconnecting_first() {
        // Switching source types always severs the previous edge before the
        // new producer can possibly connect.
        let mic_to_file = plan(MicActive, LoadFile);
        assert_before(&mic_to_file.steps, DisconnectSource, BeginFileLoad);
        let file_to_mic = plan(FileActive, ToggleMicrophone);
        assert_before(&file_to_mic.steps, DisconnectSource, AcquireMicrophone);
    }
}
