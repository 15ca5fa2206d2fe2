use crate::errors::SyscallError;
use core::fmt::Debug;

/// A trait for binding a syscall number to its specific argument and return type.
pub trait SyscallBinding {
    /// The syscall number which identifies this syscall.
    const SYSCALL_NO: usize;

    /// The type that is used to encode the syscalls arguments.
    ///
    /// The kernel reconstructs the arguments by reading the registers so a backwards conversion from
    /// `RawSyscallArgs` must also be possible.
    type CallArgs: TryFrom<RawSyscallArgs> + Into<RawSyscallArgs> + Debug;

    /// The type that is used to encode the syscalls result.
    type Return: FromRawSysResponse + IntoRawSysResponse + Debug;
}

/// The arguments to a syscall as they are encoded in the CPUs registers `a1-a4`.
pub type RawSyscallArgs = [usize; 4];

/// The return value of a syscall as they are encoded in the CPUs registers `a0-a1`.
pub type RawSyscallReturn = [usize; 2];

/// The data that is returned on a successful syscall invocation
pub type SyscallReturnData = usize;

/// A type that is used when a syscall requires no arguments or returns nothing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NoValue;

impl From<RawSyscallArgs> for NoValue {
    fn from(_value: RawSyscallArgs) -> Self {
        NoValue
    }
}

impl From<NoValue> for RawSyscallArgs {
    fn from(_value: NoValue) -> Self {
        [0; 4]
    }
}

impl From<SyscallReturnData> for NoValue {
    fn from(_value: SyscallReturnData) -> Self {
        NoValue
    }
}

impl From<NoValue> for SyscallReturnData {
    fn from(_value: NoValue) -> Self {
        0
    }
}

pub trait FromRawSysResponse {
    fn from_response(raw: RawSyscallReturn) -> Self;
}

pub trait IntoRawSysResponse {
    fn into_response(self) -> RawSyscallReturn;
}

pub type SyscallResult<T> = Result<T, SyscallError>;

impl<T> IntoRawSysResponse for SyscallResult<T>
where
    T: Into<SyscallReturnData>,
{
    fn into_response(self) -> RawSyscallReturn {
        match self {
            Ok(v) => [0, v.into()],
            Err(e) => [e as usize, 0],
        }
    }
}

impl<T> FromRawSysResponse for SyscallResult<T>
where
    T: TryFrom<SyscallReturnData>,
{
    fn from_response(raw: RawSyscallReturn) -> Self {
        match raw {
            [0, value] => T::try_from(value).map_err(|_| SyscallError::ValueInvalid),
            [e, _] => match SyscallError::try_from(e) {
                Ok(e) => Err(e),
                Err(_) => Err(SyscallError::UnknownError),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_success_is_encoded_with_zero_status() {
        let result: SyscallResult<usize> = Ok(5);
        assert_eq!(result.into_response(), [0, 5]);
        assert_eq!(SyscallResult::<usize>::from_response([0, 5]), Ok(5));
    }

    #[test]
    fn test_errors_are_encoded_as_status() {
        let result: SyscallResult<NoValue> = Err(SyscallError::TableFull);
        assert_eq!(result.into_response(), [2, 0]);
        assert_eq!(
            SyscallResult::<NoValue>::from_response([4, 0]),
            Err(SyscallError::Io)
        );
        assert_eq!(
            SyscallResult::<NoValue>::from_response([77, 0]),
            Err(SyscallError::UnknownError)
        );
    }

    #[test]
    fn test_undecodable_values_are_reported() {
        assert_eq!(
            SyscallResult::<u8>::from_response([0, 300]),
            Err(SyscallError::ValueInvalid)
        );
    }
}
