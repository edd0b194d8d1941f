use bitflags::bitflags;

bitflags! {
    /// Debugger-observed properties of an active statement.
    ///
    /// A set rather than an enum: one instruction can be observed as a leaf
    /// frame on one thread and a non-leaf frame on another (or recursively
    /// on the same thread), and every observation is kept.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActiveStatementFlags: u8 {
        /// The statement is in the top frame of some thread.
        const LEAF_FRAME = 0x01;

        /// The statement is a return address in some caller frame.
        const NON_LEAF_FRAME = 0x02;

        /// The frame belongs to code the user doesn't own.
        const NON_USER_CODE = 0x04;

        /// The statement has started executing but hasn't completed.
        const PARTIALLY_EXECUTED = 0x08;

        /// The frame runs the latest version of its method.
        const METHOD_UP_TO_DATE = 0x10;

        /// The frame runs a version superseded by a later, unmapped edit.
        const STALE = 0x20;
    }
}

impl ActiveStatementFlags {
    pub fn is_leaf(&self) -> bool {
        self.contains(Self::LEAF_FRAME)
    }

    pub fn is_non_leaf(&self) -> bool {
        self.contains(Self::NON_LEAF_FRAME)
    }

    pub fn is_stale(&self) -> bool {
        self.contains(Self::STALE)
    }

    /// Flag names, for display and JSON output.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
