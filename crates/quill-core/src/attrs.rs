bitflags::bitflags! {
    /// Symbol attributes the matcher consults when a pattern's head is a symbol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attributes: u32 {
        const FLAT         = 0b0001;
        const ORDERLESS    = 0b0010;
        const ONE_IDENTITY = 0b0100;
    }
}

impl Default for Attributes {
    fn default() -> Self { Attributes::empty() }
}

impl Attributes {
    /// Parses attribute names as they appear in `Attributes[f]` listings.
    /// Names the matcher has no use for (`HoldAll`, `Protected`, ...) are
    /// ignored.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = Attributes::empty();
        for n in names {
            match n {
                "Flat" => out |= Attributes::FLAT,
                "Orderless" => out |= Attributes::ORDERLESS,
                "OneIdentity" => out |= Attributes::ONE_IDENTITY,
                _ => {}
            }
        }
        out
    }
}
