//! `userAccountControl` bitfield.

/// Wrapper over the AD `userAccountControl` integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserAccountControl {
    pub value: u32,
}

impl UserAccountControl {
    pub const ACCOUNTDISABLE: u32 = 0x0002;
    pub const LOCKOUT: u32 = 0x0010;
    pub const PASSWD_NOTREQD: u32 = 0x0020;
    pub const NORMAL_ACCOUNT: u32 = 0x0200;
    pub const DONT_EXPIRE_PASSWORD: u32 = 0x1_0000;

    /// Code written for an enabled normal account (512).
    pub const ENABLED: u32 = Self::NORMAL_ACCOUNT;
    /// Code written for a disabled normal account (514).
    pub const DISABLED: u32 = Self::NORMAL_ACCOUNT | Self::ACCOUNTDISABLE;

    pub fn from_value(value: u32) -> Self {
        Self { value }
    }

    /// Parse the attribute's decimal string. AD sometimes returns it signed.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        raw.parse::<u32>()
            .ok()
            .or_else(|| raw.parse::<i64>().ok().map(|v| v as u32))
            .map(Self::from_value)
    }

    pub fn has(&self, flag: u32) -> bool {
        self.value & flag == flag
    }

    pub fn is_disabled(&self) -> bool {
        self.has(Self::ACCOUNTDISABLE)
    }

    pub fn is_locked(&self) -> bool {
        self.has(Self::LOCKOUT)
    }

    /// Set the disable bit, keeping every other flag.
    #[must_use]
    pub fn disable(self) -> Self {
        Self::from_value(self.value | Self::ACCOUNTDISABLE)
    }

    /// Clear the disable bit, keeping every other flag.
    #[must_use]
    pub fn enable(self) -> Self {
        Self::from_value(self.value & !Self::ACCOUNTDISABLE)
    }
}

impl From<u32> for UserAccountControl {
    fn from(value: u32) -> Self {
        Self::from_value(value)
    }
}

impl From<UserAccountControl> for u32 {
    fn from(uac: UserAccountControl) -> Self {
        uac.value
    }
}
