//! Channel mode string parsing.

use super::types::{ModeClasses, ParsedMode};

#[derive(Clone, Copy)]
enum PlusMinus {
    Plus,
    Minus,
}

/// Parse the arguments of a MODE change (`["+ov-b", "alice", "bob", "*!*@x"]`)
/// into one entry per letter.
///
/// Parameters are consumed positionally, only by letters whose class takes
/// one for the current sign. Letters outside every class consume nothing and
/// come back with `class: None`. Status and list letters that run out of
/// parameters come back with `param: None` (a list query such as `+b`).
/// Mode strings without a leading sign are read as `+`.
pub fn parse_mode_change(classes: &ModeClasses, pieces: &[&str]) -> Vec<ParsedMode> {
    use self::PlusMinus::*;

    let mut res = Vec::new();

    let Some((first, rest)) = pieces.split_first() else {
        return res;
    };
    let mut args = rest.iter();
    let mut cur_mod = Plus;

    for c in first.chars() {
        match c {
            '+' => cur_mod = Plus,
            '-' => cur_mod = Minus,
            letter => {
                let adding = matches!(cur_mod, Plus);
                let class = classes.classify(letter);
                let param = match class {
                    Some(class) if class.takes_param(adding) => args.next().map(|a| a.to_string()),
                    _ => None,
                };
                res.push(ParsedMode {
                    adding,
                    letter,
                    class,
                    param,
                });
            }
        }
    }

    res
}
