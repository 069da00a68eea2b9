use serde::{Deserialize, Serialize};

/// Index into a vocabulary
pub type TokenId = u32;

/// Ids of the reserved vocabulary entries.
///
/// The tokenizer store always lays these out first, in this order,
/// so the defaults below hold for every vocabulary it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    pub unk: TokenId,
    pub pad: TokenId,
    pub sos: TokenId,
    pub eos: TokenId,
}

impl SpecialTokens {
    pub const UNK: &'static str = "<unk>";
    pub const PAD: &'static str = "<pad>";
    pub const SOS: &'static str = "<sos>";
    pub const EOS: &'static str = "<eos>";

    /// Surface forms in id order
    pub fn surface_forms() -> [&'static str; 4] {
        [Self::UNK, Self::PAD, Self::SOS, Self::EOS]
    }

    /// Padding and sentence boundaries. `<unk>` stands for a word and
    /// is not framing.
    pub fn is_framing(&self, id: TokenId) -> bool {
        id == self.pad || id == self.sos || id == self.eos
    }
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self { unk: 0, pad: 1, sos: 2, eos: 3 }
    }
}
