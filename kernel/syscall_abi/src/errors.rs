macro_rules! back_to_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vmeta:meta])* $vname:ident $(= $val:expr)?,)*
    }) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$vmeta])* $vname $(= $val)?,)*
        }

        impl core::convert::TryFrom<usize> for $name {
            type Error = ();

            fn try_from(v: usize) -> Result<Self, Self::Error> {
                match v {
                    $(x if x == $name::$vname as usize => Ok($name::$vname),)*
                    _ => Err(()),
                }
            }
        }
    }
}

back_to_enum! {
    /// The status codes with which a syscall can fail
    #[repr(usize)]
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub enum SyscallError {
        /// No file with the requested name exists
        NotFound = 1,
        /// The file table has no free slot for another file
        TableFull = 2,
        /// The data does not fit into a file
        TooLarge = 3,
        /// The block device reported an error
        Io = 4,
        /// An argument was malformed or pointed to memory the caller may not access
        InvalidArg = 5,
        /// The requested syscall number is not known to the kernel
        UnknownSyscall = 6,
        /// The kernel returned a value that could not be decoded
        ValueInvalid = usize::MAX - 1,
        /// The kernel returned a status code that is not known
        UnknownError = usize::MAX,
    }
}
