/// Anything carrying up to four serial-number slots.
pub trait SerialSlots {
    fn serial_slots(&self) -> [Option<&str>; 4];

    /// Trimmed, non-blank serials in slot order.
    fn serials(&self) -> Vec<&str> {
        self.serial_slots()
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn has_serial(&self) -> bool {
        !self.serials().is_empty()
    }

    fn carries_serial(&self, serial: &str) -> bool {
        let serial = serial.trim();
        !serial.is_empty() && self.serials().iter().any(|s| *s == serial)
    }

    fn shares_serial_with<T: SerialSlots + ?Sized>(&self, other: &T) -> bool {
        let theirs = other.serials();
        self.serials().iter().any(|s| theirs.contains(s))
    }
}
