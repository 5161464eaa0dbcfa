//! Slash commands accepted by the chat prompt.
//!
//! Anything that does not start with `/` is sent to the coach as a message.

/// A parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Start(String),
    Pause(String),
    Resume(String),
    Reset(String),
    Step { tool: String, step: String },
    Goto { tool: String, index: usize },
    Block { tool: String, block: String },
    Confirm(String),
    Remind(String),
    Time { tool: String, time: Option<String> },
    Delete(String),
    Retire(String),
    Expand(String),
    Accept,
    Dismiss,
    Tools,
    Stats,
    Clear,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  /start <tool>            start a focus timer
  /pause <tool>            pause a running timer
  /resume <tool>           resume a paused timer
  /reset <tool>            reset a timer to its full duration
  /step <tool> <step>      toggle a checklist step (e.g. step-2)
  /goto <tool> <n>         make step n (1-based) the active step
  /block <tool> <block>    toggle a day plan block (e.g. block-1)
  /confirm <tool>          confirm a draft reminder
  /remind <tool>           switch a reminder on or off
  /time <tool> [HH:MM]     set or clear a reminder time
  /delete <tool>           delete a reminder
  /retire <tool>           close any tool
  /expand <message>        show a long message in full
  /accept, /dismiss        answer the current nudge
  /tools, /stats, /clear, /help, /quit";

impl Command {
    /// Parse one input line. Returns an error message for malformed commands.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Say(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match name {
            "start" => one(name, &args).map(Command::Start),
            "pause" => one(name, &args).map(Command::Pause),
            "resume" => one(name, &args).map(Command::Resume),
            "reset" => one(name, &args).map(Command::Reset),
            "confirm" => one(name, &args).map(Command::Confirm),
            "remind" => one(name, &args).map(Command::Remind),
            "delete" => one(name, &args).map(Command::Delete),
            "retire" => one(name, &args).map(Command::Retire),
            "expand" => one(name, &args).map(Command::Expand),
            "step" => match args.as_slice() {
                [tool, step] => Ok(Command::Step {
                    tool: tool.to_string(),
                    step: step.to_string(),
                }),
                _ => Err("usage: /step <tool> <step>".to_string()),
            },
            "goto" => match args.as_slice() {
                [tool, n] => match n.parse::<usize>() {
                    Ok(n) if n >= 1 => Ok(Command::Goto {
                        tool: tool.to_string(),
                        index: n - 1,
                    }),
                    _ => Err(format!("not a step number: {n}")),
                },
                _ => Err("usage: /goto <tool> <n>".to_string()),
            },
            "block" => match args.as_slice() {
                [tool, block] => Ok(Command::Block {
                    tool: tool.to_string(),
                    block: block.to_string(),
                }),
                _ => Err("usage: /block <tool> <block>".to_string()),
            },
            "time" => match args.as_slice() {
                [tool] => Ok(Command::Time {
                    tool: tool.to_string(),
                    time: None,
                }),
                [tool, time] => Ok(Command::Time {
                    tool: tool.to_string(),
                    time: Some(time.to_string()),
                }),
                _ => Err("usage: /time <tool> [HH:MM]".to_string()),
            },
            "accept" => Ok(Command::Accept),
            "dismiss" => Ok(Command::Dismiss),
            "tools" => Ok(Command::Tools),
            "stats" => Ok(Command::Stats),
            "clear" => Ok(Command::Clear),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command: /{other} (try /help)")),
        }
    }
}

fn one(name: &str, args: &[&str]) -> Result<String, String> {
    match args {
        [id] => Ok(id.to_string()),
        _ => Err(format!("usage: /{name} <id>")),
    }
}
