/*
Time-Indexed Values
===================

Everything in this crate is scheduled against future audio-clock times, so a
quantity like "how many voices are sounding" has no single current value.
It has a value *at a time*. `Timeline<T>` stores those values as a list of
events sorted by time:

    time   0.0    0.5    0.5    1.0
    value   1      2      1      0
            ▲             ▲
            │             └─ later insert at the same time wins
            └─ value_at(0.3) == 1

Queries resolve to the last event at or before the query time. Two events at
the same time keep insertion order, so the most recent write wins for that
instant without erasing the earlier one.

Mutations that change a running total (voice occupancy) insert their own
event and then walk every later event, adjusting it in place. That walk is
forward-only, which is why callers must issue writes for one timeline in the
order they want them applied.
*/

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent<T> {
    pub time: f64,
    pub value: T,
}

#[derive(Debug, Clone)]
pub struct Timeline<T> {
    events: Vec<TimelineEvent<T>>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEvent<T>> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Insert after every event at or before `time`.
    pub fn add(&mut self, time: f64, value: T) {
        let index = self.events.partition_point(|event| event.time <= time);
        self.events.insert(index, TimelineEvent { time, value });
    }

    /// Last event at or before `time`.
    pub fn event_at(&self, time: f64) -> Option<&TimelineEvent<T>> {
        let index = self.events.partition_point(|event| event.time <= time);
        index.checked_sub(1).map(|i| &self.events[i])
    }

    pub fn get(&self, time: f64) -> Option<&T> {
        self.event_at(time).map(|event| &event.value)
    }

    /// Last event strictly before `time`.
    pub fn event_before(&self, time: f64) -> Option<&TimelineEvent<T>> {
        let index = self.events.partition_point(|event| event.time < time);
        index.checked_sub(1).map(|i| &self.events[i])
    }

    /// First event strictly after `time`.
    pub fn event_after(&self, time: f64) -> Option<&TimelineEvent<T>> {
        let index = self.events.partition_point(|event| event.time <= time);
        self.events.get(index)
    }

    /// Index of the first event strictly after `time`, plus the event at or
    /// before it. Used by interpolating readers.
    pub(crate) fn neighbours(
        &self,
        time: f64,
    ) -> (Option<&TimelineEvent<T>>, Option<&TimelineEvent<T>>) {
        let index = self.events.partition_point(|event| event.time <= time);
        let prev = index.checked_sub(1).map(|i| &self.events[i]);
        (prev, self.events.get(index))
    }

    pub fn last(&self) -> Option<&TimelineEvent<T>> {
        self.events.last()
    }

    /// Remove every event at or after `time`.
    pub fn cancel(&mut self, time: f64) -> Vec<TimelineEvent<T>> {
        let index = self.events.partition_point(|event| event.time < time);
        self.events.split_off(index)
    }

    /// Remove every event strictly after `time`.
    pub fn cancel_after(&mut self, time: f64) -> Vec<TimelineEvent<T>> {
        let index = self.events.partition_point(|event| event.time <= time);
        self.events.split_off(index)
    }

    /// Apply `adjust` to every event strictly after `time`, in time order.
    pub fn update_after(&mut self, time: f64, mut adjust: impl FnMut(&mut T)) {
        let index = self.events.partition_point(|event| event.time <= time);
        for event in &mut self.events[index..] {
            adjust(&mut event.value);
        }
    }

    /// Apply `adjust` to every event at or after `time`.
    pub fn update_from(&mut self, time: f64, mut adjust: impl FnMut(&mut T)) {
        let index = self.events.partition_point(|event| event.time < time);
        for event in &mut self.events[index..] {
            adjust(&mut event.value);
        }
    }

    /// Like [`update_from`](Self::update_from), with each event's time.
    pub fn update_each_from(&mut self, time: f64, mut adjust: impl FnMut(f64, &mut T)) {
        let index = self.events.partition_point(|event| event.time < time);
        for event in &mut self.events[index..] {
            adjust(event.time, &mut event.value);
        }
    }

    /// Drop history that can no longer be observed: everything before the
    /// last event at or before `time` (that one still defines the value).
    pub fn forget_before(&mut self, time: f64) {
        let index = self.events.partition_point(|event| event.time <= time);
        if index > 1 {
            self.events.drain(..index - 1);
        }
    }
}

impl<T: Copy> Timeline<T> {
    pub fn value_at(&self, time: f64) -> Option<T> {
        self.get(time).copied()
    }
}
