//! SSH command line parsing.
//!
//! The command arrives verbatim from the SSH server, e.g.
//! `git-upload-pack 'acme/widgets.git'`, and is untrusted input.

use crate::error::GitError;
use crate::Result;
use gitward_types::AccessMode;
use std::fmt;
use std::str::FromStr;

/// Allow-listed git services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitVerb {
    /// Fetch and clone.
    UploadPack,
    /// `git archive --remote`.
    UploadArchive,
    /// Push.
    ReceivePack,
}

impl GitVerb {
    /// Mode the caller needs to run this service.
    pub fn required_mode(self) -> AccessMode {
        match self {
            GitVerb::UploadPack | GitVerb::UploadArchive => AccessMode::Read,
            GitVerb::ReceivePack => AccessMode::Write,
        }
    }

    /// Whether the service writes to the repository.
    pub fn is_write(self) -> bool {
        self.required_mode() >= AccessMode::Write
    }

    /// Subcommand name for `git <subcommand>`.
    pub fn subcommand(self) -> &'static str {
        match self {
            GitVerb::UploadPack => "upload-pack",
            GitVerb::UploadArchive => "upload-archive",
            GitVerb::ReceivePack => "receive-pack",
        }
    }
}

impl FromStr for GitVerb {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git-upload-pack" => Ok(GitVerb::UploadPack),
            "git-upload-archive" => Ok(GitVerb::UploadArchive),
            "git-receive-pack" => Ok(GitVerb::ReceivePack),
            other => Err(GitError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for GitVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git-{}", self.subcommand())
    }
}

/// A parsed SSH command.
///
/// The verb is kept as received; use [`SshCommand::git_verb`] to check it
/// against the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCommand {
    /// Verb exactly as sent by the client.
    pub verb: String,
    /// Repository owner, lower-case.
    pub owner: String,
    /// Repository name, lower-case, without `.git` / `.wiki`.
    pub name: String,
    /// The path named the repository's wiki.
    pub is_wiki: bool,
}

impl SshCommand {
    /// Resolve the verb against the allow-list.
    pub fn git_verb(&self) -> Result<GitVerb> {
        self.verb.parse()
    }

    /// Normalized repository path handed to git, relative to the storage root.
    pub fn repo_path(&self) -> String {
        let suffix = if self.is_wiki { ".wiki.git" } else { ".git" };
        format!("{}/{}{}", self.owner, self.name, suffix)
    }

    /// `owner/name` without suffixes.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Strip one layer of matching single or double quotes.
fn unquote(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// Split a raw SSH command into verb and repository path.
///
/// The verb itself is not validated here.
pub fn parse_ssh_command(raw: &str) -> Result<SshCommand> {
    let (verb, remainder) = raw
        .split_once(' ')
        .ok_or_else(|| GitError::InvalidRepositoryPath(raw.to_string()))?;

    let path = unquote(remainder.trim()).to_lowercase();
    let path = path.strip_prefix('/').unwrap_or(&path);

    let (owner, name) = path
        .split_once('/')
        .filter(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| GitError::InvalidRepositoryPath(remainder.to_string()))?;

    let name = name.strip_suffix(".git").unwrap_or(name);
    let (name, is_wiki) = match name.strip_suffix(".wiki") {
        Some(base) => (base, true),
        None => (name, false),
    };
    if name.is_empty() {
        return Err(GitError::InvalidRepositoryPath(remainder.to_string()));
    }

    Ok(SshCommand {
        verb: verb.to_string(),
        owner: owner.to_string(),
        name: name.to_string(),
        is_wiki,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_quoted_command() {
        let cmd = parse_ssh_command("git-upload-pack 'Acme/Widgets.git'").unwrap();
        assert_eq!(cmd.verb, "git-upload-pack");
        assert_eq!(cmd.owner, "acme");
        assert_eq!(cmd.name, "widgets");
        assert!(!cmd.is_wiki);
        assert_eq!(cmd.repo_path(), "acme/widgets.git");
        assert_eq!(cmd.git_verb().unwrap(), GitVerb::UploadPack);
    }

    #[test]
    fn test_parse_leading_slash_and_double_quotes() {
        let cmd = parse_ssh_command("git-receive-pack \"/acme/widgets\"").unwrap();
        assert_eq!(cmd.full_name(), "acme/widgets");
        assert_eq!(cmd.git_verb().unwrap(), GitVerb::ReceivePack);
    }

    #[test]
    fn test_parse_wiki_suffix() {
        let cmd = parse_ssh_command("git-receive-pack 'acme/widgets.wiki.git'").unwrap();
        assert_eq!(cmd.name, "widgets");
        assert!(cmd.is_wiki);
        assert_eq!(cmd.repo_path(), "acme/widgets.wiki.git");
    }

    #[test]
    fn test_only_one_suffix_layer_is_removed() {
        let cmd = parse_ssh_command("git-upload-pack 'acme/widgets.git.git'").unwrap();
        assert_eq!(cmd.name, "widgets.git");
    }

    #[test]
    fn test_invalid_paths() {
        for raw in [
            "git-upload-pack",
            "git-upload-pack 'widgets'",
            "git-upload-pack 'acme/widgets/extra'",
            "git-upload-pack '/widgets'",
            "git-upload-pack 'acme/'",
            "git-upload-pack 'acme/.git'",
        ] {
            let err = parse_ssh_command(raw).unwrap_err();
            assert!(
                matches!(err, GitError::InvalidRepositoryPath(_)),
                "{raw} should be rejected"
            );
            assert_eq!(err.client_message(), "Invalid repository path");
        }
    }

    #[test]
    fn test_verb_is_not_validated_by_parser() {
        let cmd = parse_ssh_command("rm 'acme/widgets'").unwrap();
        assert_eq!(cmd.verb, "rm");
        assert!(matches!(cmd.git_verb(), Err(GitError::UnknownCommand(v)) if v == "rm"));
    }

    #[test]
    fn test_verb_modes() {
        assert_eq!(GitVerb::UploadPack.required_mode(), AccessMode::Read);
        assert_eq!(GitVerb::UploadArchive.required_mode(), AccessMode::Read);
        assert_eq!(GitVerb::ReceivePack.required_mode(), AccessMode::Write);
        assert!(GitVerb::ReceivePack.is_write());
        assert!(!GitVerb::UploadArchive.is_write());
        assert_eq!(GitVerb::UploadArchive.to_string(), "git-upload-archive");
    }

    proptest! {
        #[test]
        fn prop_parsed_path_is_lowercase(owner in "[A-Za-z][A-Za-z0-9-]{0,15}", name in "[A-Za-z][A-Za-z0-9-]{0,15}") {
            let raw = format!("git-upload-pack '{owner}/{name}.git'");
            let cmd = parse_ssh_command(&raw).unwrap();
            prop_assert_eq!(cmd.owner, owner.to_lowercase());
            prop_assert_eq!(cmd.name, name.to_lowercase());
        }

        #[test]
        fn prop_parser_never_panics(raw in ".{0,64}") {
            let _ = parse_ssh_command(&raw);
        }
    }
}
