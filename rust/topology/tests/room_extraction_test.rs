// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use nalgebra::Point2;
use spaceplan_topology::{PlanarNetwork, Segment2};

struct Wall {
    start: (f64, f64),
    end: (f64, f64),
    curved: bool,
}

fn wall(x0: f64, y0: f64, x1: f64, y1: f64) -> Wall {
    Wall {
        start: (x0, y0),
        end: (x1, y1),
        curved: false,
    }
}

fn centerline(wall: &Wall) -> Option<Segment2> {
    if wall.curved {
        return None;
    }
    Some(Segment2::new(
        Point2::new(wall.start.0, wall.start.1),
        Point2::new(wall.end.0, wall.end.1),
    ))
}

fn room_areas(network: &PlanarNetwork) -> Vec<f64> {
    let mut areas: Vec<f64> = network
        .find_bounded_regions()
        .iter()
        .map(|cycle| network.signed_area(cycle))
        .collect();
    areas.sort_by(f64::total_cmp);
    areas
}

#[test]
fn row_of_offices_yields_one_region_per_office() {
    let walls = vec![
        wall(0.0, 0.0, 15.0, 0.0),
        wall(15.0, 0.0, 15.0, 5.0),
        wall(15.0, 5.0, 0.0, 5.0),
        wall(0.0, 5.0, 0.0, 0.0),
        wall(5.0, 0.0, 5.0, 5.0),
        wall(10.0, 0.0, 10.0, 5.0),
        // stub into the corridor, pruned as dangling
        wall(15.0, 2.5, 18.0, 2.5),
    ];
    let network = PlanarNetwork::from_segments(&walls, centerline).unwrap();

    let areas = room_areas(&network);
    assert_eq!(areas.len(), 3);
    for area in areas {
        assert_relative_eq!(area, 25.0, epsilon = 1e-9);
    }
}

#[test]
fn separate_buildings_are_walked_independently() {
    let mut walls = vec![
        wall(0.0, 0.0, 4.0, 0.0),
        wall(4.0, 0.0, 4.0, 4.0),
        wall(4.0, 4.0, 0.0, 4.0),
        wall(0.0, 4.0, 0.0, 0.0),
    ];
    walls.extend([
        wall(10.0, 0.0, 12.0, 0.0),
        wall(12.0, 0.0, 12.0, 3.0),
        wall(12.0, 3.0, 10.0, 3.0),
        wall(10.0, 3.0, 10.0, 0.0),
    ]);
    let network = PlanarNetwork::from_segments(&walls, centerline).unwrap();

    let areas = room_areas(&network);
    assert_eq!(areas.len(), 2);
    assert_relative_eq!(areas[0], 6.0, epsilon = 1e-9);
    assert_relative_eq!(areas[1], 16.0, epsilon = 1e-9);
}

#[test]
fn walls_without_centerline_are_ignored() {
    let mut walls = vec![
        wall(0.0, 0.0, 6.0, 0.0),
        wall(6.0, 0.0, 6.0, 6.0),
        wall(6.0, 6.0, 0.0, 6.0),
        wall(0.0, 6.0, 0.0, 0.0),
    ];
    walls.push(Wall {
        start: (3.0, 0.0),
        end: (3.0, 6.0),
        curved: true,
    });
    let network = PlanarNetwork::from_segments(&walls, centerline).unwrap();

    let rooms = network.find_bounded_regions();
    assert_eq!(rooms.len(), 1);
    let polygon = network.region_polygon(&rooms[0]).unwrap();
    assert_eq!(polygon.len(), 4);
}
