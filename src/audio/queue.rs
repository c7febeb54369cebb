use rand::seq::SliceRandom;
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use crate::audio::track::Track;

/// Tamaño fijo de página para `/queue`
pub const QUEUE_PAGE_SIZE: usize = 10;

/// Cola FIFO de una sesión.
///
/// El orden es el de inserción salvo que se llame a [`TrackQueue::shuffle`],
/// que permuta todos los elementos en ese instante.
#[derive(Debug)]
pub struct TrackQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl TrackQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega un track al final. Devuelve `false` si la cola está llena.
    pub fn push_back(&mut self, track: Track) -> bool {
        if self.items.len() >= self.max_size {
            debug!("Cola llena ({}), descartando {}", self.max_size, track.title);
            return false;
        }
        self.items.push_back(track);
        true
    }

    /// Agrega múltiples tracks (playlist) hasta llenar la capacidad.
    pub fn extend(&mut self, tracks: Vec<Track>) -> usize {
        let available_space = self.max_size.saturating_sub(self.items.len());
        let to_add = tracks.len().min(available_space);

        self.items.extend(tracks.into_iter().take(to_add));
        if to_add > 1 {
            info!("➕ Agregadas {} canciones a la cola", to_add);
        }
        to_add
    }

    /// Siguiente track en orden FIFO
    pub fn pop_front(&mut self) -> Option<Track> {
        self.items.pop_front()
    }

    /// Re-agrega el track recién terminado al final (modo loop).
    ///
    /// A diferencia de `push_back` ignora el límite: el track ya ocupaba su
    /// lugar como "actual".
    pub fn requeue(&mut self, track: Track) {
        debug!("🔁 Re-encolado por loop: {}", track.title);
        self.items.push_back(track);
    }

    /// Permuta uniformemente todos los elementos.
    pub fn shuffle(&mut self) {
        let mut rng = rand::thread_rng();
        self.items.make_contiguous().shuffle(&mut rng);
        info!("🔀 Cola mezclada ({} canciones)", self.items.len());
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_size
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    /// Suma de las duraciones conocidas (los streams en vivo cuentan cero).
    pub fn total_duration(&self) -> Duration {
        self.items.iter().map(|t| t.duration).sum()
    }

    /// Duración de los tracks que están delante de la posición `position`
    /// (1-based).
    pub fn duration_ahead_of(&self, position: usize) -> Duration {
        self.items
            .iter()
            .take(position.saturating_sub(1))
            .map(|t| t.duration)
            .sum()
    }

    /// Obtiene una página específica de la cola (1-based, se ajusta a la última).
    pub fn page(&self, page: usize) -> QueuePage {
        let total_pages = if self.items.is_empty() {
            1
        } else {
            self.items.len().div_ceil(QUEUE_PAGE_SIZE)
        };
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * QUEUE_PAGE_SIZE;

        QueuePage {
            items: self
                .items
                .iter()
                .skip(start)
                .take(QUEUE_PAGE_SIZE)
                .cloned()
                .collect(),
            first_position: start + 1,
            current_page,
            total_pages,
            total_tracks: self.items.len(),
            total_duration: self.total_duration(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuePage {
    pub items: Vec<Track>,
    /// Posición (1-based) del primer elemento de la página
    pub first_position: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_tracks: usize,
    pub total_duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(n: usize) -> Track {
        Track::new(format!("id{n}"), format!("song{n}"), format!("https://youtu.be/{n}"))
            .with_duration(Duration::from_secs(60))
    }

    fn titles(queue: &TrackQueue) -> Vec<String> {
        queue.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = TrackQueue::new(10);
        queue.push_back(track(1));
        queue.push_back(track(2));
        queue.push_back(track(3));

        assert_eq!(queue.pop_front().map(|t| t.title), Some("song1".to_string()));
        assert_eq!(titles(&queue), vec!["song2", "song3"]);
    }

    #[test]
    fn test_extend_respects_capacity() {
        let mut queue = TrackQueue::new(3);
        queue.push_back(track(0));
        let added = queue.extend((1..=5).map(track).collect());

        assert_eq!(added, 2);
        assert!(queue.is_full());
        assert!(!queue.push_back(track(9)));
    }

    #[test]
    fn test_shuffle_keeps_all_elements() {
        let mut queue = TrackQueue::new(100);
        queue.extend((0..50).map(track).collect());
        queue.shuffle();

        let mut shuffled = titles(&queue);
        shuffled.sort();
        let mut expected: Vec<String> = (0..50).map(|n| format!("song{n}")).collect();
        expected.sort();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn test_paging_clamps_to_last_page() {
        let mut queue = TrackQueue::new(100);
        queue.extend((1..=23).map(track).collect());

        let page = queue.page(7);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.first_position, 21);
        assert_eq!(page.total_tracks, 23);
        assert_eq!(page.total_duration, Duration::from_secs(23 * 60));

        let first = queue.page(0);
        assert_eq!(first.current_page, 1);
        assert_eq!(first.items.len(), QUEUE_PAGE_SIZE);
    }

    #[test]
    fn test_empty_queue_has_one_page() {
        let queue = TrackQueue::new(10);
        let page = queue.page(1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_duration_ahead_of_position() {
        let mut queue = TrackQueue::new(10);
        queue.extend((1..=3).map(track).collect());

        assert_eq!(queue.duration_ahead_of(1), Duration::ZERO);
        assert_eq!(queue.duration_ahead_of(3), Duration::from_secs(120));
    }
}
