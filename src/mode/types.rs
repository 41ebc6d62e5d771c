//! Mode classes and parsed mode changes.

/// Which of the disjoint mode classes a letter belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeClass {
    /// Per-member status (`o`, `v`, ...). Always takes a nickname.
    Status,
    /// Mask lists (`b`, `e`, `I`). Always takes a mask.
    List,
    /// Takes a parameter on both set and unset (`k`).
    ParamAlways,
    /// Takes a parameter only when set (`l`).
    ParamOnSet,
    /// Plain on/off flag.
    Flag,
}

impl ModeClass {
    /// Whether a letter of this class consumes a positional parameter.
    pub fn takes_param(self, adding: bool) -> bool {
        match self {
            ModeClass::Status | ModeClass::List | ModeClass::ParamAlways => true,
            ModeClass::ParamOnSet => adding,
            ModeClass::Flag => false,
        }
    }
}

/// One letter of a mode change with its resolved parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedMode {
    pub adding: bool,
    pub letter: char,
    /// `None` when the letter is not in any known class.
    pub class: Option<ModeClass>,
    pub param: Option<String>,
}

/// A value in a channel's generic mode map.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeValue {
    Flag,
    Param(String),
}

/// The letter sets a server uses, normally learned from ISUPPORT.
///
/// Status letters are kept in rank order alongside their display symbols.
/// The sets are kept disjoint: a letter advertised in `PREFIX` is a status
/// letter even if `CHANMODES` also lists it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeClasses {
    status: Vec<(char, char)>,
    /// CHANMODES groups A-D as advertised, before status letters are removed.
    advertised: [String; 4],
    list: String,
    param_always: String,
    param_on_set: String,
    flags: String,
}

impl Default for ModeClasses {
    fn default() -> Self {
        let mut classes = Self {
            status: Vec::new(),
            advertised: Default::default(),
            list: String::new(),
            param_always: String::new(),
            param_on_set: String::new(),
            flags: String::new(),
        };
        classes.set_prefix("qaohv", "~&@%+");
        classes.set_chanmodes("beI", "k", "lfj", "imnpstcgrzCMNOQRSTu");
        classes
    }
}

impl ModeClasses {
    /// Replace the status letters from `PREFIX=(modes)symbols`.
    pub fn set_prefix(&mut self, modes: &str, symbols: &str) {
        self.status = modes.chars().zip(symbols.chars()).collect();
        self.rebuild();
    }

    /// Replace the other classes from `CHANMODES=A,B,C,D`.
    pub fn set_chanmodes(&mut self, list: &str, always: &str, on_set: &str, flags: &str) {
        self.advertised = [list.into(), always.into(), on_set.into(), flags.into()];
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let status = &self.status;
        let keep = |set: &str| -> String {
            set.chars()
                .filter(|c| !status.iter().any(|&(m, _)| m == *c))
                .collect()
        };
        let [a, b, c, d] = &self.advertised;
        let (list, always, on_set, flags) = (keep(a), keep(b), keep(c), keep(d));
        self.list = list;
        self.param_always = always;
        self.param_on_set = on_set;
        self.flags = flags;
    }

    /// Class of a letter, or `None` if the server never advertised it.
    pub fn classify(&self, letter: char) -> Option<ModeClass> {
        if self.status.iter().any(|&(m, _)| m == letter) {
            Some(ModeClass::Status)
        } else if self.list.contains(letter) {
            Some(ModeClass::List)
        } else if self.param_always.contains(letter) {
            Some(ModeClass::ParamAlways)
        } else if self.param_on_set.contains(letter) {
            Some(ModeClass::ParamOnSet)
        } else if self.flags.contains(letter) {
            Some(ModeClass::Flag)
        } else {
            None
        }
    }

    /// Status letter for a display symbol (`@` → `o`).
    pub fn status_for_symbol(&self, symbol: char) -> Option<char> {
        self.status.iter().find(|&&(_, s)| s == symbol).map(|&(m, _)| m)
    }

    /// Display symbol for a status letter (`o` → `@`).
    pub fn symbol_for_status(&self, letter: char) -> Option<char> {
        self.status.iter().find(|&&(m, _)| m == letter).map(|&(_, s)| s)
    }

    /// Position of a status letter, highest rank first.
    pub fn status_rank(&self, letter: char) -> Option<usize> {
        self.status.iter().position(|&(m, _)| m == letter)
    }

    pub fn status_symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.status.iter().map(|&(_, s)| s)
    }
}
