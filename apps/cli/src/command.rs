/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw name and quantity; validation happens in the orchestrator.
    Add { name: String, quantity: String },
    /// Bare `add`: submit whatever the form kept from the last rejected add.
    Resubmit,
    Toggle(usize),
    Remove(usize),
    List,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  add <name> [qty]   add an item (quantity defaults to 1)
  add                retry the input kept after a rejected add
  toggle <n>         mark item n purchased / not purchased
  rm <n>             delete item n
  list               print the list again
  help               show this help
  quit               exit";

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    match verb.to_ascii_lowercase().as_str() {
        "" => Command::Empty,
        "add" if rest.is_empty() => Command::Resubmit,
        "add" => parse_add(rest),
        "toggle" | "t" => parse_position(rest).map_or_else(|| Command::Unknown(line.to_string()), Command::Toggle),
        "rm" | "del" | "delete" => {
            parse_position(rest).map_or_else(|| Command::Unknown(line.to_string()), Command::Remove)
        }
        "list" | "ls" => Command::List,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// A trailing integer is the quantity; everything before it is the name.
fn parse_add(rest: &str) -> Command {
    match rest.rsplit_once(char::is_whitespace) {
        Some((name, quantity)) if quantity.parse::<i64>().is_ok() => Command::Add {
            name: name.trim().to_string(),
            quantity: quantity.to_string(),
        },
        _ => Command::Add {
            name: rest.to_string(),
            quantity: "1".to_string(),
        },
    }
}

fn parse_position(rest: &str) -> Option<usize> {
    rest.parse::<usize>().ok().filter(|n| *n >= 1)
}

#[cfg(test)]
#[path = "tests/command_tests.rs"]
mod tests;
