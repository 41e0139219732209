//! Annotation records produced by the ADB decoder

/// Display row an annotation belongs to.
///
/// Sinks that render decoded intervals group them into three rows: the raw
/// cell phases and out-of-band conditions, the bit-level framing, and the
/// assembled bytes. Intervals on different rows may overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationRow {
    /// Low/High phases, Attention, Reset, Service Request
    Cells,
    /// Data bits, start bits, stop bits
    Bits,
    /// Assembled bytes
    Bytes,
}

/// Kind of protocol construct an annotation describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Ordinary low phase of a bit cell
    Low,
    /// Ordinary high phase of a bit cell
    High,
    /// Mid-length low pulse opening a command frame
    Attention,
    /// Extra-long low pulse, bus-wide reset
    Reset,
    /// One decoded data bit
    Bit,
    /// Eight data bits assembled MSB-first
    Byte,
    /// Start bit delimiting a data byte
    Start,
    /// Stop bit delimiting a data byte
    Stop,
    /// Device-initiated service request pulse
    ServiceRequest,
}

impl AnnotationKind {
    /// The display row this kind is routed to
    pub fn row(&self) -> AnnotationRow {
        match self {
            AnnotationKind::Low
            | AnnotationKind::High
            | AnnotationKind::Attention
            | AnnotationKind::Reset
            | AnnotationKind::ServiceRequest => AnnotationRow::Cells,
            AnnotationKind::Bit | AnnotationKind::Start | AnnotationKind::Stop => {
                AnnotationRow::Bits
            }
            AnnotationKind::Byte => AnnotationRow::Bytes,
        }
    }
}

/// An annotated interval of the capture
///
/// `labels` is ordered from most to least detailed so a sink can pick a
/// variant based on available display space; the most detailed variant is
/// always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// First sample index covered by this interval
    pub start_sample: u64,
    /// Last sample index covered by this interval
    pub end_sample: u64,
    /// Human-readable labels, most to least detailed
    pub labels: Vec<String>,
}

impl Annotation {
    fn new(kind: AnnotationKind, start_sample: u64, end_sample: u64, labels: Vec<String>) -> Self {
        Self {
            kind,
            start_sample,
            end_sample,
            labels,
        }
    }

    /// Ordinary low phase; labeled with its duration in whole microseconds
    pub fn low(start_sample: u64, end_sample: u64, us: u64) -> Self {
        Self::new(
            AnnotationKind::Low,
            start_sample,
            end_sample,
            vec![format!("{}", us)],
        )
    }

    /// Ordinary high phase; labeled with its duration in whole microseconds
    pub fn high(start_sample: u64, end_sample: u64, us: u64) -> Self {
        Self::new(
            AnnotationKind::High,
            start_sample,
            end_sample,
            vec![format!("{}", us)],
        )
    }

    /// Attention condition
    pub fn attention(start_sample: u64, end_sample: u64, us: u64) -> Self {
        Self::new(
            AnnotationKind::Attention,
            start_sample,
            end_sample,
            vec![format!("Attn:{}", us), "Attn".to_string(), "A".to_string()],
        )
    }

    /// Global reset condition
    pub fn reset(start_sample: u64, end_sample: u64, us: u64) -> Self {
        Self::new(
            AnnotationKind::Reset,
            start_sample,
            end_sample,
            vec![format!("Reset:{}", us), "Reset".to_string(), "R".to_string()],
        )
    }

    /// Service request condition
    pub fn service_request(start_sample: u64, end_sample: u64, us: u64) -> Self {
        Self::new(
            AnnotationKind::ServiceRequest,
            start_sample,
            end_sample,
            vec![format!("SRQ:{}", us), "SRQ".to_string()],
        )
    }

    /// One data bit with its value
    pub fn bit(start_sample: u64, end_sample: u64, value: u8) -> Self {
        Self::new(
            AnnotationKind::Bit,
            start_sample,
            end_sample,
            vec![format!("{}", value)],
        )
    }

    /// An assembled byte, upper-case hex
    pub fn byte(start_sample: u64, end_sample: u64, value: u8) -> Self {
        Self::new(
            AnnotationKind::Byte,
            start_sample,
            end_sample,
            vec![format!("{:02X}", value)],
        )
    }

    /// Start bit
    pub fn start(start_sample: u64, end_sample: u64) -> Self {
        Self::new(
            AnnotationKind::Start,
            start_sample,
            end_sample,
            vec!["Start".to_string(), "S".to_string()],
        )
    }

    /// Stop bit
    pub fn stop(start_sample: u64, end_sample: u64) -> Self {
        Self::new(
            AnnotationKind::Stop,
            start_sample,
            end_sample,
            vec!["Stop".to_string(), "P".to_string()],
        )
    }
}
