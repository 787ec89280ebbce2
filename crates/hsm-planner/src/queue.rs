//! FIFO arc-queue scheduler: keeps split arc fragments ("lobes") in
//! coherent chains so the joiner connects consecutive arcs along the
//! same lobe rather than jumping between unrelated ones.

use geo::EuclideanDistance;
use hsm_core::Arc;

pub struct ArcQueueScheduler {
    queues: Vec<Vec<Arc>>,
    proximity: f64,
}

impl ArcQueueScheduler {
    pub fn new(proximity: f64) -> Self {
        ArcQueueScheduler {
            queues: Vec::new(),
            proximity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    fn tail_distance(queue: &[Arc], candidate: &Arc) -> f64 {
        let tail = match queue.last() {
            Some(a) => a,
            None => return f64::MAX,
        };
        let tail_end = tail.path.0.last().copied();
        let cand_start = candidate.path.0.first().copied();
        match (tail_end, cand_start) {
            (Some(a), Some(b)) => {
                geo::Point::from(a).euclidean_distance(&geo::Point::from(b))
            }
            _ => f64::MAX,
        }
    }

    /// Appends each new fragment to the queue whose tail is nearest (and
    /// within `proximity`), or starts a new queue at the back. Drains
    /// the head queue if it is stable (unmodified by this call) while
    /// later queues were modified — see the module docs for why FIFO-
    /// head drainage preserves chain coherency.
    ///
    /// Fast path: with exactly one existing queue and one new fragment
    /// that lands in it, the general rule above would never drain (the
    /// lone queue is both head and modified), deferring every emission
    /// to `flush()` at section end. Append and drain immediately instead
    /// — the common case for a pocket with a single lobe.
    ///
    /// Returns the arcs of any drained queue(s), in draining order.
    pub fn queue_arcs(&mut self, new_arcs: Vec<Arc>) -> Vec<Arc> {
        if self.queues.len() == 1 && new_arcs.len() == 1 {
            if Self::tail_distance(&self.queues[0], &new_arcs[0]) <= self.proximity {
                let arc = new_arcs.into_iter().next().unwrap();
                self.queues[0].push(arc);
                return self.queues.remove(0);
            }
        }

        let mut modified = vec![false; self.queues.len()];

        for arc in new_arcs {
            let mut best: Option<(usize, f64)> = None;
            for (i, q) in self.queues.iter().enumerate() {
                let d = Self::tail_distance(q, &arc);
                if d <= self.proximity && best.map(|(_, bd)| d < bd).unwrap_or(true) {
                    best = Some((i, d));
                }
            }

            match best {
                Some((i, _)) => {
                    self.queues[i].push(arc);
                    modified[i] = true;
                }
                None => {
                    self.queues.push(vec![arc]);
                    modified.push(true);
                }
            }
        }

        let head_stable = !modified.is_empty() && !modified[0];
        let any_modified = modified.iter().any(|m| *m);

        if head_stable && any_modified && !self.queues.is_empty() {
            self.queues.remove(0)
        } else {
            Vec::new()
        }
    }

    /// Drains every remaining queue in FIFO order. Call at the end of a
    /// spine section so `pending_arc_queues` is empty before starting
    /// the next one.
    pub fn flush(&mut self) -> Vec<Arc> {
        let mut out = Vec::new();
        for q in self.queues.drain(..) {
            out.extend(q);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, Point};

    fn arc_at(x: f64) -> Arc {
        Arc::new_fragment(
            Point::new(x, 0.0),
            1.0,
            LineString::new(vec![Coord { x, y: 0.0 }, Coord { x: x + 1.0, y: 0.0 }]),
        )
    }

    #[test]
    fn fast_path_drains_a_single_queue_immediately() {
        let mut scheduler = ArcQueueScheduler::new(100.0);
        let drained = scheduler.queue_arcs(vec![arc_at(0.0)]);
        assert!(drained.is_empty());
        // arc_at(1.0) chains onto the one existing queue's tail (end at
        // x=1.0) within `proximity`; with exactly one queue and one new
        // fragment this must drain immediately, not wait for `flush()`.
        let drained = scheduler.queue_arcs(vec![arc_at(1.0)]);
        assert_eq!(drained.len(), 2);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn drains_head_when_stable_and_others_moved() {
        let mut scheduler = ArcQueueScheduler::new(100.0);
        // seed two separate chains far apart so they never merge
        let drained = scheduler.queue_arcs(vec![arc_at(0.0)]);
        assert!(drained.is_empty());
        let drained = scheduler.queue_arcs(vec![arc_at(1000.0)]);
        // second call only touches queue[1], queue[0] is stable -> drains
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn flush_empties_all_queues() {
        let mut scheduler = ArcQueueScheduler::new(0.5);
        scheduler.queue_arcs(vec![arc_at(0.0)]);
        scheduler.queue_arcs(vec![arc_at(500.0)]);
        let remaining = scheduler.flush();
        assert!(scheduler.is_empty());
        assert!(!remaining.is_empty());
    }
}
