//! Resolución de caminos de una ruta
//!
//! Reconstruye, a partir de la cadena `self_id` de las paradas, la secuencia
//! ordenada de un camino `(route_id, path_id)`. El resultado es un arreglo
//! explícito (`RoutePath`) que se construye una sola vez y luego se consulta
//! por índice.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::models::stop::{stop_key, Stop, StopLink};

/// Separador visual entre estaciones
pub const PATH_SEPARATOR: &str = " → ";

/// Cadena de paradas inconsistente
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("route {route_id}: origin stop '{stop_id}' not found")]
    OriginNotFound { route_id: i32, stop_id: String },

    #[error("route {route_id}: stop '{stop_id}' is not a path origin")]
    NotAnOrigin { route_id: i32, stop_id: String },

    #[error("route {route_id} path {path_id}: expected one origin, found {count}")]
    OriginCount { route_id: i32, path_id: i32, count: usize },

    #[error("route {route_id} path {path_id}: expected one terminal stop, found {count}")]
    TerminalCount { route_id: i32, path_id: i32, count: usize },

    #[error("route {route_id} path {path_id}: stop id '{stop_id}' is duplicated")]
    DuplicateStop { route_id: i32, path_id: i32, stop_id: String },

    #[error("route {route_id} path {path_id}: stop '{stop_id}' has more than one successor")]
    Branch { route_id: i32, path_id: i32, stop_id: String },

    #[error("route {route_id} path {path_id}: cycle through stop '{stop_id}'")]
    Cycle { route_id: i32, path_id: i32, stop_id: String },

    #[error("route {route_id} path {path_id}: {count} stop(s) unreachable from the origin")]
    Unreachable { route_id: i32, path_id: i32, count: usize },
}

/// Parada dentro de un camino ya resuelto
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStop {
    /// Nivel 1..N en orden de recorrido
    pub level: usize,
    pub stop_id: String,
    pub station_id: i32,
    pub station_name: String,
    pub time: Option<String>,
}

/// Camino resuelto: arreglo ordenado de paradas de `(route_id, path_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePath {
    pub route_id: i32,
    pub path_id: i32,
    pub stops: Vec<PathStop>,
}

impl RoutePath {
    pub fn station_names(&self) -> Vec<&str> {
        self.stops.iter().map(|s| s.station_name.as_str()).collect()
    }

    /// Texto de presentación, p. ej. "Hanoi → Ninh Binh → Vinh"
    pub fn display(&self) -> String {
        self.station_names().join(PATH_SEPARATOR)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// Resuelve el camino que empieza en `origin_stop_id` dentro de la ruta.
///
/// `stops` puede contener paradas de varias rutas y caminos; solo se usan las
/// del mismo `(route_id, path_id)` que el origen.
pub fn resolve_path(stops: &[Stop], route_id: i32, origin_stop_id: &str) -> Result<RoutePath, PathError> {
    let origin_key = stop_key(origin_stop_id);
    let origin = stops
        .iter()
        .find(|s| s.route_id == route_id && stop_key(&s.id) == origin_key)
        .ok_or_else(|| PathError::OriginNotFound {
            route_id,
            stop_id: origin_stop_id.to_string(),
        })?;

    if !origin.is_origin() {
        return Err(PathError::NotAnOrigin {
            route_id,
            stop_id: origin.id.clone(),
        });
    }

    resolve_group(stops, route_id, origin.path_id)
}

/// Resuelve el camino `(route_id, path_id)` completo.
pub fn resolve_group(stops: &[Stop], route_id: i32, path_id: i32) -> Result<RoutePath, PathError> {
    let group: Vec<&Stop> = stops
        .iter()
        .filter(|s| s.route_id == route_id && s.path_id == path_id)
        .collect();

    let mut seen = HashSet::with_capacity(group.len());
    for stop in &group {
        if !seen.insert(stop_key(&stop.id)) {
            return Err(PathError::DuplicateStop {
                route_id,
                path_id,
                stop_id: stop.id.clone(),
            });
        }
    }

    let origins: Vec<&Stop> = group.iter().copied().filter(|s| s.link() == StopLink::Origin).collect();
    if origins.len() != 1 {
        return Err(PathError::OriginCount {
            route_id,
            path_id,
            count: origins.len(),
        });
    }

    let terminals: Vec<&Stop> = group.iter().copied().filter(|s| s.link() == StopLink::Terminal).collect();
    if terminals.len() != 1 {
        return Err(PathError::TerminalCount {
            route_id,
            path_id,
            count: terminals.len(),
        });
    }

    // Índice: id de la parada anterior -> posiciones de sus sucesoras
    let mut successors: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, stop) in group.iter().enumerate() {
        if let StopLink::After(upstream) = stop.link() {
            successors.entry(stop_key(upstream)).or_default().push(index);
        }
    }

    let mut ordered: Vec<&Stop> = Vec::with_capacity(group.len());
    let mut visited: HashSet<String> = HashSet::with_capacity(group.len());
    let mut current = origins[0];
    visited.insert(stop_key(&current.id));
    ordered.push(current);

    loop {
        let next = match successors.get(&stop_key(&current.id)).map(Vec::as_slice) {
            None | Some([]) => break,
            Some([only]) => group[*only],
            Some(_) => {
                return Err(PathError::Branch {
                    route_id,
                    path_id,
                    stop_id: current.id.clone(),
                })
            }
        };

        if !visited.insert(stop_key(&next.id)) || ordered.len() >= group.len() {
            return Err(PathError::Cycle {
                route_id,
                path_id,
                stop_id: next.id.clone(),
            });
        }
        ordered.push(next);
        current = next;
    }

    ordered.push(terminals[0]);
    visited.insert(stop_key(&terminals[0].id));

    if ordered.len() != group.len() {
        let leftover: Vec<&Stop> = group
            .iter()
            .copied()
            .filter(|s| !visited.contains(&stop_key(&s.id)))
            .collect();
        if let Some(stop_id) = find_cycle(&leftover) {
            return Err(PathError::Cycle { route_id, path_id, stop_id });
        }
        return Err(PathError::Unreachable {
            route_id,
            path_id,
            count: leftover.len(),
        });
    }

    Ok(RoutePath {
        route_id,
        path_id,
        stops: ordered
            .into_iter()
            .enumerate()
            .map(|(index, stop)| PathStop {
                level: index + 1,
                stop_id: stop.id.clone(),
                station_id: stop.station_id,
                station_name: stop.station_name.clone(),
                time: stop.time.clone(),
            })
            .collect(),
    })
}

/// Resuelve cada camino de la ruta por separado, ordenados por `path_id`.
pub fn resolve_route_paths(stops: &[Stop], route_id: i32) -> Vec<(i32, Result<RoutePath, PathError>)> {
    let mut path_ids: Vec<i32> = stops
        .iter()
        .filter(|s| s.route_id == route_id)
        .map(|s| s.path_id)
        .collect();
    path_ids.sort_unstable();
    path_ids.dedup();

    path_ids
        .into_iter()
        .map(|path_id| (path_id, resolve_group(stops, route_id, path_id)))
        .collect()
}

/// Sigue los enlaces hacia atrás entre paradas no alcanzadas; devuelve una
/// parada del ciclo si lo hay.
fn find_cycle(leftover: &[&Stop]) -> Option<String> {
    let by_id: HashMap<String, &Stop> = leftover.iter().map(|s| (stop_key(&s.id), *s)).collect();

    for start in leftover {
        let mut trail = HashSet::new();
        let mut cursor = *start;
        loop {
            if !trail.insert(stop_key(&cursor.id)) {
                return Some(cursor.id.clone());
            }
            match cursor.link() {
                StopLink::After(upstream) => match by_id.get(&stop_key(upstream)) {
                    Some(previous) => cursor = previous,
                    None => break,
                },
                _ => break,
            }
        }
    }
    None
}
