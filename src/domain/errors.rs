/// Error kinds of the live chart pipeline.
///
/// Local, recoverable kinds (`MalformedTick`, `ResizeFailure`) are absorbed
/// where they happen. The rest reach the owning caller through
/// [`crate::domain::events::ChartEvent::ErrorRaised`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    MalformedTick(String),
    HistoricalFetchFailure(String),
    SurfaceInitFailure(String),
    ResizeFailure(String),
    DataApplyFailure(String),
    StreamDisconnected(String),
    ContainerNeverReady { attempts: u32 },
    InvalidInput(String),
}

impl ChartError {
    /// Whether the error should be shown to the user rather than only logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ChartError::MalformedTick(_) | ChartError::ResizeFailure(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::MalformedTick(_) => "malformedTick",
            ChartError::HistoricalFetchFailure(_) => "historicalFetchFailure",
            ChartError::SurfaceInitFailure(_) => "surfaceInitFailure",
            ChartError::ResizeFailure(_) => "resizeFailure",
            ChartError::DataApplyFailure(_) => "dataApplyFailure",
            ChartError::StreamDisconnected(_) => "streamDisconnected",
            ChartError::ContainerNeverReady { .. } => "containerNeverReady",
            ChartError::InvalidInput(_) => "invalidInput",
        }
    }
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::MalformedTick(msg) => write!(f, "Malformed tick: {}", msg),
            ChartError::HistoricalFetchFailure(msg) => {
                write!(f, "Historical data unavailable: {}", msg)
            }
            ChartError::SurfaceInitFailure(msg) => write!(f, "Chart failed to initialize: {}", msg),
            ChartError::ResizeFailure(msg) => write!(f, "Resize failed: {}", msg),
            ChartError::DataApplyFailure(msg) => write!(f, "Chart update failed: {}", msg),
            ChartError::StreamDisconnected(msg) => write!(f, "Live feed disconnected: {}", msg),
            ChartError::ContainerNeverReady { attempts } => {
                write!(f, "Chart container never became ready after {} checks", attempts)
            }
            ChartError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ChartError {}

impl From<ChartError> for wasm_bindgen::JsValue {
    fn from(error: ChartError) -> Self {
        wasm_bindgen::JsValue::from_str(&error.to_string())
    }
}

pub type ChartResult<T> = Result<T, ChartError>;
