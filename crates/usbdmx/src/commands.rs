//! Console command parsing

use anyhow::{anyhow, bail, Context, Result};
use usbdmx_control::dmx::parse_hex_color;

/// One console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List attached devices that pass the filters
    Devices,
    /// Select a device, optionally by its position in `devices`
    Enable(Option<usize>),
    Connect,
    Disconnect,
    /// Write raw values starting at a channel
    Set { channel: u16, values: Vec<u8> },
    Color(u8, u8, u8),
    Uv(u8),
    Dimmer(u8),
    Strobe(u8),
    Blackout,
    Resend,
    Info,
    Universe,
    State,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  devices                 list attached DMX bridges
  enable [n]              select a bridge (n = position in `devices`)
  connect                 open the selected bridge
  disconnect              close the bridge, it stays paired
  set <ch> <v>[,<v>...]   write values starting at channel <ch>
  color #rrggbb           set the Flat PAR colour
  uv <v>                  set the Flat PAR UV channel
  dimmer <v>              set the Flat PAR dimmer
  strobe <v>              set the Flat PAR strobe (0 = off)
  blackout                set every channel to 0
  resend                  send the current universe again
  info                    show the bound device
  universe                show the non-zero channels
  state                   show the session state
  help                    this text
  quit                    disconnect and exit";

impl Command {
    /// Parse a console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match name.to_ascii_lowercase().as_str() {
            "devices" | "list" => Command::Devices,
            "enable" => Command::Enable(
                args.first()
                    .map(|n| {
                        n.parse::<usize>()
                            .with_context(|| format!("Invalid device index '{}'", n))
                    })
                    .transpose()?,
            ),
            "connect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "set" => {
                let [channel, values] = args[..] else {
                    bail!("Usage: set <channel> <value>[,<value>...]");
                };
                Command::Set {
                    channel: channel
                        .parse::<u16>()
                        .with_context(|| format!("Invalid channel '{}'", channel))?,
                    values: parse_values(values)?,
                }
            }
            "color" | "colour" => {
                let hex = single_arg(&args, "color #rrggbb")?;
                let (r, g, b) = parse_hex_color(hex)?;
                Command::Color(r, g, b)
            }
            "uv" => Command::Uv(parse_value(single_arg(&args, "uv <value>")?)?),
            "dimmer" => Command::Dimmer(parse_value(single_arg(&args, "dimmer <value>")?)?),
            "strobe" => Command::Strobe(parse_value(single_arg(&args, "strobe <value>")?)?),
            "blackout" => Command::Blackout,
            "resend" => Command::Resend,
            "info" => Command::Info,
            "universe" => Command::Universe,
            "state" => Command::State,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command '{}', try 'help'", other),
        };
        Ok(Some(command))
    }
}

fn single_arg<'a>(args: &[&'a str], usage: &str) -> Result<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(anyhow!("Usage: {}", usage)),
    }
}

fn parse_value(word: &str) -> Result<u8> {
    word.parse::<u8>()
        .with_context(|| format!("'{}' is not a channel value (0-255)", word))
}

fn parse_values(list: &str) -> Result<Vec<u8>> {
    list.split(',').map(|v| parse_value(v.trim())).collect()
}
