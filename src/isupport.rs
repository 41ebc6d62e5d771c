//! RPL_ISUPPORT (005) parsing and the server dialect it describes.
//!
//! The parser needs the channel-type and status-message characters; the
//! presence registry needs the case mapping and mode classes. Both read them
//! from one [`ServerSupport`] that starts with common defaults and is updated
//! as 005 lines arrive.

use crate::casemap::Casemapping;
use crate::mode::ModeClasses;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsupportEntry<'a> {
    pub key: &'a str,
    pub value: Option<&'a str>,
}

/// The tokens of one 005 line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Isupport<'a> {
    entries: Vec<IsupportEntry<'a>>,
}

impl<'a> Isupport<'a> {
    /// Parse bare `KEY[=VALUE]` tokens.
    pub fn parse_params(params: &[&'a str]) -> Self {
        let entries = params
            .iter()
            .filter(|p| !p.is_empty())
            .map(|&p| match p.split_once('=') {
                Some((key, value)) => IsupportEntry { key, value: Some(value) },
                None => IsupportEntry { key: p, value: None },
            })
            .collect();
        Isupport { entries }
    }

    /// Parse the protocol arguments of a 005 reply: the leading nickname and
    /// the trailing human-readable text are skipped.
    pub fn from_response_args(args: &[&'a str]) -> Option<Self> {
        let (_nick, mut tokens) = args.split_first()?;
        if let Some(last) = tokens.last() {
            if last.contains(' ') {
                tokens = &tokens[..tokens.len() - 1];
            }
        }
        Some(Self::parse_params(tokens))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IsupportEntry<'a>> {
        self.entries.iter()
    }

    /// Look up a key; the last occurrence wins.
    pub fn get(&self, key: &str) -> Option<Option<&'a str>> {
        self.entries
            .iter()
            .rfind(|e| e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value)
    }
}

/// `PREFIX=(modes)symbols`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixSpec<'a> {
    pub modes: &'a str,
    pub prefixes: &'a str,
}

impl<'a> PrefixSpec<'a> {
    pub fn parse(s: &'a str) -> Option<Self> {
        let inner = s.strip_prefix('(')?;
        let (modes, prefixes) = inner.split_once(')')?;
        if modes.chars().count() != prefixes.chars().count() {
            return None;
        }
        Some(PrefixSpec { modes, prefixes })
    }
}

/// `CHANMODES=A,B,C,D`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChanModes<'a> {
    /// List modes (ban, exempt, invite-exempt).
    pub a: &'a str,
    /// Always take a parameter.
    pub b: &'a str,
    /// Take a parameter only when set.
    pub c: &'a str,
    /// Never take a parameter.
    pub d: &'a str,
}

impl<'a> ChanModes<'a> {
    pub fn parse(s: &'a str) -> Option<Self> {
        let mut parts = s.splitn(4, ',');
        Some(ChanModes {
            a: parts.next()?,
            b: parts.next()?,
            c: parts.next()?,
            d: parts.next()?,
        })
    }
}

/// The server dialect in effect for parsing and state tracking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSupport {
    /// Characters that start a channel name.
    pub chantypes: String,
    /// Status prefixes allowed in front of a channel target (`@#chan`).
    pub statusmsg: String,
    pub casemapping: Casemapping,
    pub modes: ModeClasses,
    pub network: Option<String>,
}

impl Default for ServerSupport {
    fn default() -> Self {
        Self {
            chantypes: "#&".to_string(),
            statusmsg: "~&@%+".to_string(),
            casemapping: Casemapping::Rfc1459,
            modes: ModeClasses::default(),
            network: None,
        }
    }
}

impl ServerSupport {
    /// Whether `name` starts with a channel-type character.
    pub fn is_channel(&self, name: &str) -> bool {
        name.chars().next().is_some_and(|c| self.chantypes.contains(c))
    }

    /// Fold in the tokens of one 005 line.
    pub fn apply(&mut self, isupport: &Isupport<'_>) {
        if let Some(Some(types)) = isupport.get("CHANTYPES") {
            self.chantypes = types.to_string();
        }
        if let Some(Some(symbols)) = isupport.get("STATUSMSG") {
            self.statusmsg = symbols.to_string();
        }
        if let Some(Some(mapping)) = isupport.get("CASEMAPPING") {
            self.casemapping = Casemapping::from_token(mapping);
        }
        if let Some(Some(network)) = isupport.get("NETWORK") {
            self.network = Some(network.to_string());
        }
        if let Some(spec) = isupport.get("PREFIX").flatten().and_then(PrefixSpec::parse) {
            self.modes.set_prefix(spec.modes, spec.prefixes);
        }
        if let Some(chanmodes) = isupport.get("CHANMODES").flatten().and_then(ChanModes::parse) {
            self.modes.set_chanmodes(chanmodes.a, chanmodes.b, chanmodes.c, chanmodes.d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ModeClass;

    #[test]
    fn test_from_response_args_skips_nick_and_trailing() {
        let args = [
            "bot",
            "CHANTYPES=#",
            "EXCEPTS",
            "PREFIX=(ov)@+",
            "are supported by this server",
        ];
        let isupport = Isupport::from_response_args(&args).unwrap();
        assert_eq!(isupport.iter().count(), 3);
        assert_eq!(isupport.get("chantypes"), Some(Some("#")));
        assert_eq!(isupport.get("EXCEPTS"), Some(None));
        assert_eq!(isupport.get("NICKLEN"), None);
    }

    #[test]
    fn test_prefix_spec() {
        let spec = PrefixSpec::parse("(qaohv)~&@%+").unwrap();
        assert_eq!(spec.modes, "qaohv");
        assert_eq!(spec.prefixes, "~&@%+");
        assert!(PrefixSpec::parse("(ov)@").is_none());
        assert!(PrefixSpec::parse("@+").is_none());
    }

    #[test]
    fn test_apply_updates_dialect() {
        let mut support = ServerSupport::default();
        let args = [
            "bot",
            "CHANTYPES=#!",
            "CASEMAPPING=ascii",
            "PREFIX=(ov)@+",
            "CHANMODES=beIq,k,fl,imnpst",
            "NETWORK=ExampleNet",
        ];
        support.apply(&Isupport::from_response_args(&args).unwrap());

        assert!(support.is_channel("!chan"));
        assert!(!support.is_channel("&chan"));
        assert_eq!(support.casemapping, Casemapping::Ascii);
        assert_eq!(support.network.as_deref(), Some("ExampleNet"));
        assert_eq!(support.modes.classify('q'), Some(ModeClass::List));
        assert_eq!(support.modes.classify('h'), None);
        assert_eq!(support.modes.classify('f'), Some(ModeClass::ParamOnSet));
    }
}
