use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::{CommandDataOption, CommandDataOptionValue, CommandOptionType},
        id::GuildId,
    },
    prelude::Context,
};
use std::collections::HashMap;

use crate::{config::MAX_VOLUME, session::Command};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
        queue_command(),
        nowplaying_command(),
        shuffle_command(),
        loop_command(),
        autoplay_command(),
        volume_command(),
        leave_command(),
    ]
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce una canción o playlist")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL o término de búsqueda",
            )
            .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip")
        .description("Salta la canción actual (por votación si no la pediste tú)")
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "force",
            "Saltar sin votación (requiere permisos)",
        ))
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la reproducción y limpia la cola")
}

// Comandos de cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Muestra la cola de reproducción")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Número de página")
                .min_int_value(1),
        )
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Muestra información de la canción actual")
}

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Mezcla las canciones en cola")
}

fn loop_command() -> CreateCommand {
    CreateCommand::new("loop")
        .description("Repite las canciones al terminar")
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "enabled",
            "Activar o desactivar (por defecto alterna)",
        ))
}

fn autoplay_command() -> CreateCommand {
    CreateCommand::new("autoplay")
        .description("Continúa con música relacionada cuando la cola se vacía")
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "enabled",
            "Activar o desactivar (por defecto alterna)",
        ))
}

// Comandos de audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Ajusta el volumen")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "level", "Nivel de volumen (0-150)")
                .required(true)
                .min_int_value(0)
                .max_int_value(u64::from(MAX_VOLUME)),
        )
}

// Comandos de conexión

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Desconecta el bot del canal de voz")
}

/// Valor de una opción de slash command ya extraído de serenity.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

#[derive(Debug, Default)]
pub struct CommandOptions(HashMap<String, OptionValue>);

impl CommandOptions {
    pub fn from_interaction(options: &[CommandDataOption]) -> Self {
        let values = options
            .iter()
            .filter_map(|opt| {
                let value = match &opt.value {
                    CommandDataOptionValue::String(s) => OptionValue::String(s.clone()),
                    CommandDataOptionValue::Integer(i) => OptionValue::Integer(*i),
                    CommandDataOptionValue::Boolean(b) => OptionValue::Boolean(*b),
                    _ => return None,
                };
                Some((opt.name.clone(), value))
            })
            .collect();
        Self(values)
    }

    pub fn with(mut self, name: &str, value: OptionValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    fn string(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(OptionValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn integer(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(OptionValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        match self.0.get(name) {
            Some(OptionValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Traduce un slash command a una intención de sesión.
///
/// Devuelve `None` para comandos desconocidos u opciones obligatorias ausentes.
pub fn parse_command(name: &str, options: &CommandOptions) -> Option<Command> {
    let command = match name {
        "play" => {
            let query = options.string("query")?.trim();
            if query.is_empty() {
                return None;
            }
            Command::Play {
                query: query.to_string(),
            }
        }
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "skip" => Command::Skip {
            force: options.boolean("force").unwrap_or(false),
        },
        "stop" => Command::Stop,
        "queue" => Command::Queue {
            page: options.integer("page").unwrap_or(1).max(1) as usize,
        },
        "nowplaying" => Command::NowPlaying,
        "shuffle" => Command::Shuffle,
        "loop" => Command::Loop {
            enabled: options.boolean("enabled"),
        },
        "autoplay" => Command::Autoplay {
            enabled: options.boolean("enabled"),
        },
        "volume" => Command::Volume {
            level: options.integer("level")?,
        },
        "leave" => Command::Disconnect,
        _ => return None,
    };

    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_play_requires_query() {
        assert_eq!(parse_command("play", &CommandOptions::default()), None);

        let options = CommandOptions::default().with("query", OptionValue::String("  lofi  ".into()));
        assert_eq!(
            parse_command("play", &options),
            Some(Command::Play {
                query: "lofi".to_string()
            })
        );
    }

    #[test]
    fn test_optional_flags_default() {
        let none = CommandOptions::default();
        assert_eq!(parse_command("skip", &none), Some(Command::Skip { force: false }));
        assert_eq!(parse_command("queue", &none), Some(Command::Queue { page: 1 }));
        assert_eq!(parse_command("loop", &none), Some(Command::Loop { enabled: None }));
        assert_eq!(parse_command("leave", &none), Some(Command::Disconnect));
    }

    #[test]
    fn test_volume_and_unknown_commands() {
        let options = CommandOptions::default().with("level", OptionValue::Integer(80));
        assert_eq!(parse_command("volume", &options), Some(Command::Volume { level: 80 }));
        assert_eq!(parse_command("volume", &CommandOptions::default()), None);
        assert_eq!(parse_command("equalizer", &CommandOptions::default()), None);
    }

    #[test]
    fn test_every_registered_command_parses() {
        let options = CommandOptions::default()
            .with("query", OptionValue::String("x".into()))
            .with("level", OptionValue::Integer(10));

        for command in all_commands() {
            let name = serde_json::to_value(&command).unwrap()["name"]
                .as_str()
                .unwrap()
                .to_string();
            assert!(parse_command(&name, &options).is_some(), "/{} sin traducción", name);
        }
    }
}
