//! Script-based language detection used to pick the answer language.

/// Outcome of [`detect_language`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Most letters are in the Arabic script and none are specific to Persian or Urdu.
    Arabic,
    /// Letters are mostly outside the Arabic script, or the text uses Persian or Urdu letters.
    Other,
    /// No letters to judge by (empty, digits, punctuation).
    Undetermined,
}

impl Language {
    /// Whether the text should be answered in Arabic.
    pub fn is_arabic(self) -> bool {
        matches!(self, Self::Arabic)
    }
}

const ARABIC_RATIO_THRESHOLD: f32 = 0.5;

/// Classify `text` by the share of its letters written in Arabic script. Never fails.
///
/// Persian and Urdu share the script, so any letter that Arabic itself does not use
/// (`پ چ ژ گ ک ی ے ٹ ڈ ڑ ں ھ ہ`) marks the text as [`Language::Other`].
pub fn detect_language(text: &str) -> Language {
    let mut letters = 0usize;
    let mut arabic_script = 0usize;
    for ch in text.chars().filter(|ch| ch.is_alphabetic()) {
        letters += 1;
        if is_arabic_script(ch) {
            arabic_script += 1;
        }
        if is_persian_or_urdu_letter(ch) {
            return Language::Other;
        }
    }

    if letters == 0 {
        return Language::Undetermined;
    }
    if arabic_script as f32 / letters as f32 >= ARABIC_RATIO_THRESHOLD {
        Language::Arabic
    } else {
        Language::Other
    }
}

fn is_arabic_script(ch: char) -> bool {
    matches!(
        ch as u32,
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF
    )
}

fn is_persian_or_urdu_letter(ch: char) -> bool {
    matches!(
        ch,
        '\u{067E}' // pe
            | '\u{0686}' // tcheh
            | '\u{0698}' // jeh
            | '\u{06AF}' // gaf
            | '\u{06A9}' // keheh
            | '\u{06CC}' // farsi yeh
            | '\u{06D2}' // yeh barree
            | '\u{0679}' // tteh
            | '\u{0688}' // ddal
            | '\u{0691}' // rreh
            | '\u{06BA}' // noon ghunna
            | '\u{06BE}' // heh doachashmee
            | '\u{06C1}' // heh goal
    )
}
