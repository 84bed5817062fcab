//! Console commands.

use anyhow::{Context, Result, anyhow, bail};
use tabdeck_registry::TabId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// New active tab, at the given URL or the configured new-tab page.
    NewTab(Option<String>),
    /// Navigate the active tab.
    Open(String),
    Close(Option<TabId>),
    Activate(TabId),
    Discard(TabId),
    /// Pretend the tab's document changed its title.
    Title(TabId, String),
    Do(String, Option<TabId>),
    Reopen,
    List,
    Tree,
    GroupNew(String),
    GroupSelect(usize),
    Groups,
    Save,
    Help,
    Quit,
}

pub const HELP: &str = "\
new [url]            open a tab and activate it
open <url>           navigate the active tab
close [id]           close a tab (default: the active one)
activate <id>        activate a tab
discard <id>         unload a background tab
title <id> <text>    report a title change for a tab
do <action> [id]     send stop/reload/back/forward to a tab
reopen               reopen the last closed tab
list                 list tabs
tree                 list tabs by opener
group new <name>     create a tab group
group select <n>     show group n
groups               list tab groups
save                 write the session now
help                 this text
quit                 save and exit";

impl Command {
    /// Parses one console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let words = shell_words::split(line).context("unbalanced quotes")?;
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (name.as_str(), args) {
            ("new", []) => Command::NewTab(None),
            ("new", [url]) => Command::NewTab(Some(url.clone())),
            ("open", [url]) => Command::Open(url.clone()),
            ("close", []) => Command::Close(None),
            ("close", [id]) => Command::Close(Some(parse_id(id)?)),
            ("activate", [id]) => Command::Activate(parse_id(id)?),
            ("discard", [id]) => Command::Discard(parse_id(id)?),
            ("title", [id, rest @ ..]) if !rest.is_empty() => {
                Command::Title(parse_id(id)?, rest.join(" "))
            }
            ("do", [action]) => Command::Do(action.clone(), None),
            ("do", [action, id]) => Command::Do(action.clone(), Some(parse_id(id)?)),
            ("reopen", []) => Command::Reopen,
            ("list" | "ls", []) => Command::List,
            ("tree", []) => Command::Tree,
            ("group", [sub, name]) if sub == "new" => Command::GroupNew(name.clone()),
            ("group", [sub, position]) if sub == "select" => Command::GroupSelect(
                position
                    .parse()
                    .with_context(|| format!("not a group number: {}", position))?,
            ),
            ("groups", []) => Command::Groups,
            ("save", []) => Command::Save,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => bail!("unknown command: {} (try 'help')", line.trim()),
        };
        Ok(Some(command))
    }
}

fn parse_id(raw: &str) -> Result<TabId> {
    raw.trim_start_matches('#')
        .parse::<u64>()
        .ok()
        .and_then(TabId::new)
        .ok_or_else(|| anyhow!("not a tab id: {}", raw))
}
