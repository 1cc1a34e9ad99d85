//! Per-path transport snapshot plus the scheduler-owned quota record.

use serde::Serialize;

use super::segment::PathIndex;

/// Transport state of a path, owned and advanced by the transport layer.
///
/// ```text
/// Connecting → PreEstablished → FullyEstablishing → Established ⇄ LossRecovery
///                                                        ↓
///                                                  PossiblyFailed → Unusable
/// ```
///
/// Only `Established`, `FullyEstablishing` and (conditionally)
/// `LossRecovery` paths may carry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathState {
    #[default]
    Connecting,
    /// Handshake done, final confirmation from the peer still outstanding.
    PreEstablished,
    /// Sending, but the peer has not confirmed the path yet; data on it must
    /// stay in order.
    FullyEstablishing,
    Established,
    LossRecovery,
    /// A failure probe is outstanding.
    PossiblyFailed,
    Unusable,
}

impl PathState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathState::Connecting => "connecting",
            PathState::PreEstablished => "pre_established",
            PathState::FullyEstablishing => "fully_establishing",
            PathState::Established => "established",
            PathState::LossRecovery => "loss_recovery",
            PathState::PossiblyFailed => "possibly_failed",
            PathState::Unusable => "unusable",
        }
    }

    /// States the transport allows data in at all.
    pub fn can_send(&self) -> bool {
        !matches!(self, PathState::Connecting | PathState::Unusable)
    }
}

/// Acknowledgment style of the path's congestion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Cumulative acknowledgments only. Loss recovery ends as soon as the
    /// acknowledged cursor reaches the recovery high-water mark.
    Cumulative,
    /// Selective acknowledgments; recovery resolves through the controller.
    #[default]
    Selective,
}

/// Derived per-path scheduling view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "quota", rename_all = "snake_case")]
pub enum PathView {
    Ineligible,
    Idle,
    Active(u32),
    Full(u32),
}

impl PathView {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathView::Ineligible => "ineligible",
            PathView::Idle => "idle",
            PathView::Active(_) => "active",
            PathView::Full(_) => "full",
        }
    }
}

/// Scheduler record attached 1:1 to a path. Dropped with the path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PathSchedState {
    pub(crate) quota: u32,
}

impl PathSchedState {
    /// Units a segment of `len` bytes consumes from the round allowance.
    pub(crate) fn units_for(len: u32, mss: u32) -> u32 {
        let mss = mss.max(1);
        if len > mss {
            len.div_ceil(mss)
        } else {
            1
        }
    }

    pub(crate) fn charge(&mut self, len: u32, mss: u32) {
        self.quota = self.quota.saturating_add(Self::units_for(len, mss));
    }

    pub(crate) fn reset(&mut self) {
        self.quota = 0;
    }

    pub(crate) fn view(&self, round_size: u32) -> PathView {
        match self.quota {
            0 => PathView::Idle,
            q if q < round_size => PathView::Active(q),
            q => PathView::Full(q),
        }
    }
}

/// One route contributing to the connection.
///
/// Every public field mirrors state owned by the transport layer and is
/// written by it; the scheduler only reads them. Sequence fields use 32-bit
/// wrapping arithmetic.
#[derive(Debug, Clone)]
pub struct Path {
    index: PathIndex,
    pub state: PathState,
    pub ack_mode: AckMode,
    /// Units sent and not yet acknowledged.
    pub in_flight: u32,
    /// Congestion window, in units.
    pub cwnd: u32,
    /// Maximum unit size in bytes.
    pub mss: u32,
    /// Next sequence number the transmission layer will write.
    pub write_seq: u32,
    /// Next sequence number to go on the wire.
    pub snd_nxt: u32,
    /// Oldest unacknowledged sequence number.
    pub snd_una: u32,
    /// `snd_nxt` at the moment loss recovery began.
    pub high_seq: u32,
    /// Right edge of the receiver-advertised window.
    pub wnd_end: u32,
    /// Set once a unit has been delivered on a not-yet-confirmed path.
    pub second_unit: bool,
    /// End sequence of the last unit delivered while unconfirmed.
    pub last_end_seq: u32,
    pub(crate) sched: PathSchedState,
}

impl Path {
    /// A fresh established path with an initial window of ten units.
    pub fn new(index: PathIndex, mss: u32) -> Self {
        Path {
            index,
            state: PathState::Established,
            ack_mode: AckMode::default(),
            in_flight: 0,
            cwnd: 10,
            mss,
            write_seq: 0,
            snd_nxt: 0,
            snd_una: 0,
            high_seq: 0,
            wnd_end: u32::from(u16::MAX),
            second_unit: false,
            last_end_seq: 0,
            sched: PathSchedState::default(),
        }
    }

    pub fn index(&self) -> PathIndex {
        self.index
    }

    /// Units granted to this path in the current round.
    pub fn quota(&self) -> u32 {
        self.sched.quota
    }

    /// Bytes written to the path but not yet sent.
    pub fn queued_bytes(&self) -> u32 {
        self.write_seq.wrapping_sub(self.snd_nxt)
    }

    /// Bytes the free part of the congestion window can absorb.
    pub fn cwnd_space(&self) -> u64 {
        u64::from(self.cwnd.saturating_sub(self.in_flight)) * u64::from(self.mss)
    }

    /// Quota-derived view, ignoring eligibility.
    pub fn quota_view(&self, round_size: u32) -> PathView {
        self.sched.view(round_size)
    }
}
