//! Arabic text preparation for renderers that draw glyphs left to right.
//!
//! Letters are first replaced with their contextual presentation forms
//! (isolated, final, initial, medial, plus the lam-alef ligatures), then the
//! logical string is reordered into visual order with the Unicode bidi
//! algorithm.

use unicode_bidi::BidiInfo;

const LAM: char = '\u{0644}';
const TATWEEL: char = '\u{0640}';

/// Presentation forms as `[isolated, final, initial, medial]`. Right-joining
/// letters only have the first two.
fn forms(c: char) -> Option<&'static [char]> {
    let forms: &'static [char] = match c {
        '\u{0621}' => &['\u{FE80}'],
        '\u{0622}' => &['\u{FE81}', '\u{FE82}'],
        '\u{0623}' => &['\u{FE83}', '\u{FE84}'],
        '\u{0624}' => &['\u{FE85}', '\u{FE86}'],
        '\u{0625}' => &['\u{FE87}', '\u{FE88}'],
        '\u{0626}' => &['\u{FE89}', '\u{FE8A}', '\u{FE8B}', '\u{FE8C}'],
        '\u{0627}' => &['\u{FE8D}', '\u{FE8E}'],
        '\u{0628}' => &['\u{FE8F}', '\u{FE90}', '\u{FE91}', '\u{FE92}'],
        '\u{0629}' => &['\u{FE93}', '\u{FE94}'],
        '\u{062A}' => &['\u{FE95}', '\u{FE96}', '\u{FE97}', '\u{FE98}'],
        '\u{062B}' => &['\u{FE99}', '\u{FE9A}', '\u{FE9B}', '\u{FE9C}'],
        '\u{062C}' => &['\u{FE9D}', '\u{FE9E}', '\u{FE9F}', '\u{FEA0}'],
        '\u{062D}' => &['\u{FEA1}', '\u{FEA2}', '\u{FEA3}', '\u{FEA4}'],
        '\u{062E}' => &['\u{FEA5}', '\u{FEA6}', '\u{FEA7}', '\u{FEA8}'],
        '\u{062F}' => &['\u{FEA9}', '\u{FEAA}'],
        '\u{0630}' => &['\u{FEAB}', '\u{FEAC}'],
        '\u{0631}' => &['\u{FEAD}', '\u{FEAE}'],
        '\u{0632}' => &['\u{FEAF}', '\u{FEB0}'],
        '\u{0633}' => &['\u{FEB1}', '\u{FEB2}', '\u{FEB3}', '\u{FEB4}'],
        '\u{0634}' => &['\u{FEB5}', '\u{FEB6}', '\u{FEB7}', '\u{FEB8}'],
        '\u{0635}' => &['\u{FEB9}', '\u{FEBA}', '\u{FEBB}', '\u{FEBC}'],
        '\u{0636}' => &['\u{FEBD}', '\u{FEBE}', '\u{FEBF}', '\u{FEC0}'],
        '\u{0637}' => &['\u{FEC1}', '\u{FEC2}', '\u{FEC3}', '\u{FEC4}'],
        '\u{0638}' => &['\u{FEC5}', '\u{FEC6}', '\u{FEC7}', '\u{FEC8}'],
        '\u{0639}' => &['\u{FEC9}', '\u{FECA}', '\u{FECB}', '\u{FECC}'],
        '\u{063A}' => &['\u{FECD}', '\u{FECE}', '\u{FECF}', '\u{FED0}'],
        '\u{0640}' => &['\u{0640}', '\u{0640}', '\u{0640}', '\u{0640}'],
        '\u{0641}' => &['\u{FED1}', '\u{FED2}', '\u{FED3}', '\u{FED4}'],
        '\u{0642}' => &['\u{FED5}', '\u{FED6}', '\u{FED7}', '\u{FED8}'],
        '\u{0643}' => &['\u{FED9}', '\u{FEDA}', '\u{FEDB}', '\u{FEDC}'],
        '\u{0644}' => &['\u{FEDD}', '\u{FEDE}', '\u{FEDF}', '\u{FEE0}'],
        '\u{0645}' => &['\u{FEE1}', '\u{FEE2}', '\u{FEE3}', '\u{FEE4}'],
        '\u{0646}' => &['\u{FEE5}', '\u{FEE6}', '\u{FEE7}', '\u{FEE8}'],
        '\u{0647}' => &['\u{FEE9}', '\u{FEEA}', '\u{FEEB}', '\u{FEEC}'],
        '\u{0648}' => &['\u{FEED}', '\u{FEEE}'],
        '\u{0649}' => &['\u{FEEF}', '\u{FEF0}'],
        '\u{064A}' => &['\u{FEF1}', '\u{FEF2}', '\u{FEF3}', '\u{FEF4}'],
        // Persian letters common in Iraqi names
        '\u{067E}' => &['\u{FB56}', '\u{FB57}', '\u{FB58}', '\u{FB59}'],
        '\u{0686}' => &['\u{FB7A}', '\u{FB7B}', '\u{FB7C}', '\u{FB7D}'],
        '\u{0698}' => &['\u{FB8A}', '\u{FB8B}'],
        '\u{06A9}' => &['\u{FB8E}', '\u{FB8F}', '\u{FB90}', '\u{FB91}'],
        '\u{06AF}' => &['\u{FB92}', '\u{FB93}', '\u{FB94}', '\u{FB95}'],
        '\u{06CC}' => &['\u{FBFC}', '\u{FBFD}', '\u{FBFE}', '\u{FBFF}'],
        _ => return None,
    };
    Some(forms)
}

/// Lam-alef ligature as `[isolated, final]` for the alef variant following a lam.
fn lam_alef(alef: char) -> Option<[char; 2]> {
    match alef {
        '\u{0622}' => Some(['\u{FEF5}', '\u{FEF6}']),
        '\u{0623}' => Some(['\u{FEF7}', '\u{FEF8}']),
        '\u{0625}' => Some(['\u{FEF9}', '\u{FEFA}']),
        '\u{0627}' => Some(['\u{FEFB}', '\u{FEFC}']),
        _ => None,
    }
}

fn is_transparent(c: char) -> bool {
    matches!(
        c,
        '\u{0610}'..='\u{061A}' | '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}'
    )
}

fn joins_forward(c: char) -> bool {
    c == TATWEEL || forms(c).is_some_and(|f| f.len() == 4)
}

fn joins_backward(c: char) -> bool {
    forms(c).is_some_and(|f| f.len() >= 2)
}

pub fn reshape(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len());
    // whether the last emitted letter accepts a join from the next one
    let mut open = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if is_transparent(c) {
            output.push(c);
            i += 1;
            continue;
        }

        let Some(letter_forms) = forms(c) else {
            output.push(c);
            open = false;
            i += 1;
            continue;
        };

        let joined_before = open && joins_backward(c);

        if c == LAM {
            // marks between lam and alef ride on the ligature
            let alef_at = (i + 1..chars.len()).find(|&j| !is_transparent(chars[j]));
            if let Some((j, ligature)) =
                alef_at.and_then(|j| lam_alef(chars[j]).map(|ligature| (j, ligature)))
            {
                output.push(ligature[usize::from(joined_before)]);
                output.extend(&chars[i + 1..j]);
                open = false;
                i = j + 1;
                continue;
            }
        }

        let next = chars[i + 1..].iter().copied().find(|n| !is_transparent(*n));
        let joined_after = joins_forward(c) && next.is_some_and(joins_backward);

        let form = match (joined_before, joined_after) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        };
        output.push(letter_forms.get(form).copied().unwrap_or(letter_forms[0]));
        open = joins_forward(c);
        i += 1;
    }

    output
}

fn mirror(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '\u{00AB}' => '\u{00BB}',
        '\u{00BB}' => '\u{00AB}',
        _ => c,
    }
}

/// Reorders a logical string into left-to-right visual order. Brackets in
/// right-to-left runs are swapped for their mirrored pair.
pub fn visual_order(text: &str) -> String {
    let info = BidiInfo::new(text, None);
    let mut output = String::with_capacity(text.len());

    for para in &info.paragraphs {
        let (levels, runs) = info.visual_runs(para, para.range.clone());
        for run in runs {
            if levels[run.start].is_rtl() {
                output.extend(text[run].chars().rev().map(mirror));
            } else {
                output.push_str(&text[run]);
            }
        }
    }

    output
}

pub fn display(text: &str) -> String {
    visual_order(&reshape(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_joining_word_takes_initial_medial_final() {
        // ب ي ت
        assert_eq!(reshape("بيت"), "\u{FE91}\u{FEF4}\u{FE96}");
    }

    #[test]
    fn lam_alef_becomes_a_ligature() {
        // س ل ا م: seen initial, lam-alef final, meem isolated
        assert_eq!(reshape("سلام"), "\u{FEB3}\u{FEFC}\u{FEE1}");
        assert_eq!(reshape("لا"), "\u{FEFB}");
    }

    #[test]
    fn lam_alef_forms_through_harakat() {
        // لَا keeps the fatha after the ligature
        assert_eq!(reshape("ل\u{064E}ا"), "\u{FEFB}\u{064E}");
        assert_eq!(reshape("سل\u{064E}ام"), "\u{FEB3}\u{FEFC}\u{064E}\u{FEE1}");
    }

    #[test]
    fn right_joining_letter_breaks_the_chain() {
        // د ب: dal cannot join forward so beh stays isolated
        assert_eq!(reshape("دب"), "\u{FEA9}\u{FE8F}");
    }

    #[test]
    fn marks_do_not_break_joining() {
        // بَت keeps the beh initial through the fatha
        assert_eq!(reshape("ب\u{064E}ت"), "\u{FE91}\u{064E}\u{FE96}");
    }

    #[test]
    fn latin_text_is_untouched() {
        assert_eq!(display("Phone : 12"), "Phone : 12");
    }

    #[test]
    fn arabic_is_reversed_into_visual_order() {
        assert_eq!(display("بيت"), "\u{FE96}\u{FEF4}\u{FE91}");
    }

    #[test]
    fn brackets_are_mirrored_in_arabic_runs() {
        // ن ع م: initial, medial, final, drawn right to left
        assert_eq!(display("(نعم)"), "(\u{FEE2}\u{FECC}\u{FEE7})");

        let shown = display("راضٍ (جداً)");
        assert!(shown.starts_with('('));
        assert!(shown.contains(')'));
        assert_eq!(display("Phone (x)"), "Phone (x)");
    }

    #[test]
    fn digits_keep_their_order_inside_arabic() {
        let shown = display("عدد: 42");
        assert!(shown.contains("42"));
        assert!(shown.ends_with(reshape("عدد").chars().next().unwrap()));
    }
}
