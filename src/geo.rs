//! Country code to coordinate lookup against the loaded country table.

use std::collections::HashMap;

use crate::data::{Actor, Event, GeoEntry};

/// A resolved country location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location<'a> {
    pub lat: f64,
    pub lng: f64,
    pub name: &'a str,
}

/// Case-sensitive exact-match lookups. Absence always means "unknown
/// location" and is never an error.
#[derive(Debug, Clone, Copy)]
pub struct GeoResolver<'a> {
    countries: &'a HashMap<String, GeoEntry>,
}

impl<'a> GeoResolver<'a> {
    pub fn new(countries: &'a HashMap<String, GeoEntry>) -> Self {
        Self { countries }
    }

    /// Coordinates and display name, when both coordinates are known.
    pub fn resolve(&self, country_code: &str) -> Option<Location<'a>> {
        let entry = self.countries.get(country_code)?;
        Some(Location {
            lat: entry.lat?,
            lng: entry.lng?,
            name: &entry.name_jp,
        })
    }

    /// Japanese display name; present even for entries without coordinates.
    pub fn display_name(&self, country_code: &str) -> Option<&'a str> {
        self.countries
            .get(country_code)
            .map(|e| e.name_jp.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Country code whose display name is `name_jp`.
    pub fn code_for_name(&self, name_jp: &str) -> Option<&'a str> {
        self.countries
            .iter()
            .find(|(_, entry)| entry.name_jp == name_jp)
            .map(|(code, _)| code.as_str())
    }

    /// Fill in coordinates for both actors of every event. An actor whose
    /// own code does not resolve (role codes such as `REB` or `MIL`) takes
    /// the partner's country when the partner is a place.
    pub fn resolve_events(&self, events: &mut [Event]) {
        for event in events {
            self.resolve_actor(&mut event.actor1);
            self.resolve_actor(&mut event.actor2);
            borrow_partner_country(&mut event.actor1, &event.actor2);
            borrow_partner_country(&mut event.actor2, &event.actor1);
        }
    }

    /// An actor is a place only when its own country resolved; a borrowed
    /// country still gets coordinates but stays a placeholder.
    pub fn resolve_actor(&self, actor: &mut Actor) {
        let location = actor.country_code.as_deref().and_then(|c| self.resolve(c));
        actor.lat = location.map(|l| l.lat);
        actor.lng = location.map(|l| l.lng);
        actor.is_place = location.is_some() && !actor.country_borrowed;
    }
}

fn borrow_partner_country(actor: &mut Actor, partner: &Actor) {
    if actor.coordinates().is_some() || !partner.is_place {
        return;
    }
    actor.country_code = partner.country_code.clone();
    actor.country_borrowed = true;
    actor.lat = partner.lat;
    actor.lng = partner.lng;
    actor.is_place = false;
}
