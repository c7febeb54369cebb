use serenity::{
    all::{Colour, Timestamp},
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::track::Track,
    session::{
        command::{NowPlaying, QueueSnapshot},
        CommandOutcome, Notification, SessionError,
    },
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Guild Player";

const PROGRESS_BAR_WIDTH: usize = 20;

/// Convierte el resultado de un comando en un embed.
pub fn outcome_embed(outcome: &CommandOutcome) -> CreateEmbed {
    match outcome {
        CommandOutcome::Started { track, queued } => {
            let embed = track_embed("🎵 Reproduciendo Ahora", track, colors::SUCCESS_GREEN);
            if *queued > 0 {
                embed.field("📋 En cola", format!("{} canciones más", queued), true)
            } else {
                embed
            }
        }
        CommandOutcome::Queued {
            track,
            position,
            estimated_wait,
            added,
        } => {
            let title = if *added > 1 {
                format!("✅ {} Canciones Agregadas", added)
            } else {
                "✅ Canción Agregada Exitosamente".to_string()
            };
            let wait = if estimated_wait.is_zero() {
                "Desconocido".to_string()
            } else {
                format_duration(*estimated_wait)
            };
            track_embed(&title, track, colors::SUCCESS_GREEN)
                .field("📍 Posición", position.to_string(), true)
                .field("⏳ Espera estimada", wait, true)
        }
        CommandOutcome::Skipped { skipped, next } => {
            let description = match next {
                Some(next) => format!("~~{}~~\n\n▶️ Siguiente: **{}**", skipped.title, next.title),
                None => format!("~~{}~~\n\n😴 No hay más canciones en la cola", skipped.title),
            };
            status_embed("⏭️ Canción Saltada", description, colors::INFO_BLUE)
        }
        CommandOutcome::Paused => {
            status_embed("⏸️ Pausado", "Usa `/resume` para continuar", colors::WARNING_ORANGE)
        }
        CommandOutcome::Resumed => status_embed("▶️ Reanudado", "La música continúa", colors::SUCCESS_GREEN),
        CommandOutcome::Stopped => status_embed(
            "⏹️ Detenido",
            "Se vació la cola de reproducción",
            colors::NEUTRAL_GRAY,
        ),
        CommandOutcome::Disconnected => {
            status_embed("👋 Desconectado", "¡Hasta la próxima!", colors::NEUTRAL_GRAY)
        }
        CommandOutcome::Queue(snapshot) => queue_embed(snapshot),
        CommandOutcome::Current(Some(now)) => now_playing_embed(now),
        CommandOutcome::Current(None) => status_embed(
            "😴 Nada Sonando",
            "💡 Usa `/play <canción>` para agregar música",
            colors::NEUTRAL_GRAY,
        ),
        CommandOutcome::Shuffled { tracks } => status_embed(
            "🔀 Cola Mezclada",
            format!("Se mezclaron {} canciones", tracks),
            colors::MUSIC_PURPLE,
        ),
        CommandOutcome::Volume { level } => status_embed(
            format!("{} Volumen", volume_icon(*level)),
            format!("Volumen ajustado a **{}%**", level),
            colors::INFO_BLUE,
        ),
        CommandOutcome::Loop { enabled } => status_embed(
            "🔁 Repetición",
            if *enabled { "Activada" } else { "Desactivada" },
            colors::INFO_BLUE,
        ),
        CommandOutcome::Autoplay { enabled } => status_embed(
            "🎲 Autoplay",
            if *enabled {
                "Activado: cuando la cola se vacíe seguirá con música relacionada"
            } else {
                "Desactivado"
            },
            colors::INFO_BLUE,
        ),
    }
}

/// Embed para errores devueltos al usuario.
pub fn error_embed(error: &SessionError) -> CreateEmbed {
    let colour = match error {
        SessionError::InsufficientVotes { .. } => colors::WARNING_ORANGE,
        _ => colors::ERROR_RED,
    };

    CreateEmbed::default()
        .title(error_title(error))
        .description(error_message(error))
        .color(colour)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Mensajes que la sesión publica por su cuenta en el canal de texto.
pub fn notification_embed(notification: &Notification) -> CreateEmbed {
    match notification {
        Notification::NowPlaying { track } => {
            track_embed("🎵 Reproduciendo Ahora", track, colors::SUCCESS_GREEN)
        }
        Notification::ListenersLeft { timeout } => status_embed(
            "⏸️ Canal Vacío",
            format!(
                "Pausé la música porque no queda nadie escuchando.\nMe desconectaré tras {} de inactividad.",
                format_duration(*timeout)
            ),
            colors::WARNING_ORANGE,
        ),
        Notification::ListenersReturned => {
            status_embed("▶️ ¡Bienvenido de vuelta!", "Reanudando la música", colors::SUCCESS_GREEN)
        }
        Notification::TrackFailed { track } => status_embed(
            "⚠️ Error de Reproducción",
            format!("No se pudo reproducir **{}**, pasando a la siguiente", track.title),
            colors::WARNING_ORANGE,
        ),
        Notification::BackendUnavailable => status_embed(
            "❌ Servicio de Audio No Disponible",
            "El reproductor no responde. Se vació la cola; intenta `/play` de nuevo en unos minutos.",
            colors::ERROR_RED,
        ),
        Notification::InactivityDisconnect { idle_for } => status_embed(
            "💤 Desconectado por Inactividad",
            format!("Sin actividad durante {}", format_duration(*idle_for)),
            colors::NEUTRAL_GRAY,
        ),
    }
}

fn error_title(error: &SessionError) -> &'static str {
    match error {
        SessionError::NotInVoice | SessionError::WrongChannel => "❌ Canal de Voz",
        SessionError::NotConnected | SessionError::SessionClosed => "❌ Sin Sesión",
        SessionError::NoResults => "🔍 Sin Resultados",
        SessionError::BackendUnreachable(_) | SessionError::JoinFailed(_) => "❌ Error de Conexión",
        SessionError::EmptyQueue | SessionError::QueueFull(_) => "📋 Cola",
        SessionError::NothingPlaying | SessionError::AlreadyPaused | SessionError::AlreadyPlaying => {
            "ℹ️ Reproducción"
        }
        SessionError::InsufficientVotes { .. } => "🗳️ Voto Registrado",
    }
}

pub fn error_message(error: &SessionError) -> String {
    match error {
        SessionError::NotInVoice => "Debes estar en un canal de voz para usar este comando".to_string(),
        SessionError::WrongChannel => "Debes estar en el mismo canal de voz que el bot".to_string(),
        SessionError::NotConnected => "No estoy conectado a ningún canal de voz".to_string(),
        SessionError::NoResults => "No se encontraron resultados para tu búsqueda".to_string(),
        SessionError::BackendUnreachable(_) => {
            "El servicio de audio no responde, intenta de nuevo en unos segundos".to_string()
        }
        SessionError::JoinFailed(_) => "No pude unirme al canal de voz. ¿Tengo permisos?".to_string(),
        SessionError::EmptyQueue => "No hay suficientes canciones en la cola".to_string(),
        SessionError::QueueFull(max) => format!("La cola está llena (máximo {} canciones)", max),
        SessionError::NothingPlaying => "No hay nada reproduciéndose".to_string(),
        SessionError::AlreadyPaused => "La música ya está pausada".to_string(),
        SessionError::AlreadyPlaying => "La música ya se está reproduciendo".to_string(),
        SessionError::InsufficientVotes { votes, required } => {
            format!("Votos para saltar: **{}/{}**", votes, required)
        }
        SessionError::SessionClosed => "La sesión se cerró antes de responder".to_string(),
    }
}

fn track_embed(title: &str, track: &Track, colour: Colour) -> CreateEmbed {
    let author = if track.author.is_empty() {
        "Desconocido"
    } else {
        track.author.as_str()
    };

    let mut embed = CreateEmbed::default()
        .title(title)
        .description(format!("**{}**", track.title))
        .color(colour)
        .field("🎤 Artista", author, true)
        .field("⏱️ Duración", duration_label(track), true);

    if let Some(user) = track.requested_by {
        embed = embed.field("👤 Solicitado por", format!("<@{}>", user), true);
    }

    embed = embed.field("🔗 Fuente", track.source_kind.label(), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .url(&track.source_uri)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn now_playing_embed(now: &NowPlaying) -> CreateEmbed {
    let title = if now.waiting_for_listeners {
        "⏸️ En Espera de Oyentes"
    } else if now.paused {
        "⏸️ Pausado"
    } else {
        "🎵 Reproduciendo Ahora"
    };

    let embed = track_embed(title, &now.track, colors::MUSIC_PURPLE);
    match (now.position, now.track.known_duration()) {
        (Some(position), Some(duration)) => embed.field(
            "Progreso",
            format!(
                "{} `{} / {}`",
                progress_bar(position, duration),
                format_duration(position),
                format_duration(duration)
            ),
            false,
        ),
        _ => embed,
    }
}

fn queue_embed(snapshot: &QueueSnapshot) -> CreateEmbed {
    let page = &snapshot.page;
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if page.total_tracks == 0 && snapshot.current.is_none() {
        return embed
            .description("😴 **La cola está vacía**\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    // Canción actual
    if let Some(current) = &snapshot.current {
        let status = if snapshot.loop_enabled { "🔁" } else { "▶️" };
        embed = embed.field(format!("{} Reproduciendo", status), title_line(current), false);
    }

    // Próximas canciones
    if !page.items.is_empty() {
        let description: String = page
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let duration = item
                    .known_duration()
                    .map(|d| format!(" `[{}]`", format_duration(d)))
                    .unwrap_or_default();
                format!("**{}**. {}{}\n", page.first_position + i, title_line(item), duration)
            })
            .collect();

        embed = embed.field("Próximas canciones", description, false);
    }

    // Información adicional
    let mut info = format!("**Total:** {} canciones", page.total_tracks);
    if page.total_duration > Duration::ZERO {
        info.push_str(&format!(" • **Duración:** {}", format_duration(page.total_duration)));
    }
    if snapshot.autoplay {
        info.push_str(" • 🎲 **Autoplay**");
    }
    embed = embed.field("Información", info, false);

    // Paginación
    if page.total_pages > 1 {
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Página {} de {} • Guild Player",
            page.current_page, page.total_pages
        )));
    } else {
        embed = embed.footer(CreateEmbedFooter::new(STANDARD_FOOTER));
    }

    embed.timestamp(Timestamp::now())
}

fn status_embed(title: impl Into<String>, description: impl Into<String>, colour: Colour) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(colour)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn title_line(track: &Track) -> String {
    if track.author.is_empty() {
        format!("**{}**", track.title)
    } else {
        format!("**{}** - {}", track.title, track.author)
    }
}

fn duration_label(track: &Track) -> String {
    match track.known_duration() {
        Some(duration) => format_duration(duration),
        None => "🔴 En vivo".to_string(),
    }
}

fn volume_icon(level: u8) -> &'static str {
    match level {
        0 => "🔇",
        1..=50 => "🔉",
        _ => "🔊",
    }
}

/// Barra de progreso de ancho fijo.
pub fn progress_bar(position: Duration, duration: Duration) -> String {
    if duration.is_zero() {
        return "▬".repeat(PROGRESS_BAR_WIDTH);
    }

    let ratio = (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
    let filled = (ratio * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let marker = filled.min(PROGRESS_BAR_WIDTH - 1);

    (0..PROGRESS_BAR_WIDTH)
        .map(|i| if i == marker { '🔘' } else { '▬' })
        .collect()
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
        assert_eq!(format_duration(Duration::from_secs(185)), "3:05");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn test_progress_bar_marks_position() {
        let bar = progress_bar(Duration::from_secs(50), Duration::from_secs(100));
        assert_eq!(bar.chars().count(), PROGRESS_BAR_WIDTH);
        assert_eq!(bar.chars().position(|c| c == '🔘'), Some(10));

        let done = progress_bar(Duration::from_secs(200), Duration::from_secs(100));
        assert_eq!(done.chars().position(|c| c == '🔘'), Some(PROGRESS_BAR_WIDTH - 1));
    }

    #[test]
    fn test_vote_error_shows_tally() {
        let message = error_message(&SessionError::InsufficientVotes { votes: 2, required: 3 });
        assert!(message.contains("2/3"));
    }
}
