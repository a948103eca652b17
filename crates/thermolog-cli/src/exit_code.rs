use thermolog_core::SampleError;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Failure = 1,
    Usage = 2,
    UnsupportedHardware = 3,
    NoThermalSource = 4,
    Storage = 5,
    Interrupted = 130,
}

impl From<&SampleError> for ExitCode {
    fn from(error: &SampleError) -> Self {
        match error {
            SampleError::BadTimeFormat { .. }
            | SampleError::ArgumentConflict { .. }
            | SampleError::NoModeSelected
            | SampleError::InvalidSchedule { .. } => ExitCode::Usage,
            SampleError::TopologyUnsupported { .. } | SampleError::CounterUnavailable { .. } => {
                ExitCode::UnsupportedHardware
            }
            SampleError::NoThermalSource => ExitCode::NoThermalSource,
            SampleError::Storage(_) => ExitCode::Storage,
            SampleError::Interrupted => ExitCode::Interrupted,
            SampleError::ThermalRead { .. }
            | SampleError::ZeroIntervalTicks { .. }
            | SampleError::IncompleteJoin { .. }
            | SampleError::Io(_)
            | SampleError::Json(_) => ExitCode::Failure,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(value: ExitCode) -> Self {
        value as i32
    }
}
