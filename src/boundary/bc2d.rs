use nalgebra::DMatrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryCondition {
    Dirichlet(f64),
    /// Zero normal gradient: the wall node copies its interior neighbour.
    Neumann,
    /// Dirichlet with the time-dependent lid velocity.
    MovingLid,
}

/// Conditions on the (low, high) faces of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBoundary(pub BoundaryCondition, pub BoundaryCondition);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareBoundary {
    pub x: FaceBoundary, // left, right
    pub y: FaceBoundary, // bottom, top
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConditions2D {
    pub u: SquareBoundary,
    pub v: SquareBoundary,
    pub p: SquareBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wall {
    Left,
    Right,
    Bottom,
    Top,
}

impl SquareBoundary {
    pub fn new(x: FaceBoundary, y: FaceBoundary) -> Self {
        Self { x, y }
    }

    /// Overwrites the outer ring of `field` in place.
    ///
    /// Walls are written bottom, top, left, right, so the corner nodes end up with the
    /// side-wall value.
    pub fn apply(&self, field: &mut DMatrix<f64>, lid: f64) {
        let FaceBoundary(left, right) = self.x;
        let FaceBoundary(bottom, top) = self.y;
        apply_wall(field, Wall::Bottom, bottom, lid);
        apply_wall(field, Wall::Top, top, lid);
        apply_wall(field, Wall::Left, left, lid);
        apply_wall(field, Wall::Right, right, lid);
    }
}

fn apply_wall(field: &mut DMatrix<f64>, wall: Wall, bc: BoundaryCondition, lid: f64) {
    let (nrows, ncols) = field.shape();
    if nrows < 2 || ncols < 2 {
        return;
    }
    let value = match bc {
        BoundaryCondition::Dirichlet(value) => Some(value),
        BoundaryCondition::MovingLid => Some(lid),
        BoundaryCondition::Neumann => None,
    };
    match (wall, value) {
        (Wall::Bottom, Some(value)) => field.row_mut(0).fill(value),
        (Wall::Top, Some(value)) => field.row_mut(nrows - 1).fill(value),
        (Wall::Left, Some(value)) => field.column_mut(0).fill(value),
        (Wall::Right, Some(value)) => field.column_mut(ncols - 1).fill(value),
        (Wall::Bottom, None) => {
            let inner = field.row(1).clone_owned();
            field.row_mut(0).copy_from(&inner);
        }
        (Wall::Top, None) => {
            let inner = field.row(nrows - 2).clone_owned();
            field.row_mut(nrows - 1).copy_from(&inner);
        }
        (Wall::Left, None) => {
            let inner = field.column(1).clone_owned();
            field.column_mut(0).copy_from(&inner);
        }
        (Wall::Right, None) => {
            let inner = field.column(ncols - 2).clone_owned();
            field.column_mut(ncols - 1).copy_from(&inner);
        }
    }
}

impl BoundaryConditions2D {
    /// No-slip walls with a tangentially moving lid on top. Pressure has zero normal
    /// gradient on the fixed walls and is pinned to zero along the lid.
    pub fn lid_driven_cavity() -> Self {
        use BoundaryCondition::{Dirichlet, MovingLid, Neumann};
        Self {
            u: SquareBoundary {
                x: FaceBoundary(Dirichlet(0.0), Dirichlet(0.0)),
                y: FaceBoundary(Dirichlet(0.0), MovingLid),
            },
            v: SquareBoundary {
                x: FaceBoundary(Dirichlet(0.0), Dirichlet(0.0)),
                y: FaceBoundary(Dirichlet(0.0), Dirichlet(0.0)),
            },
            p: SquareBoundary {
                x: FaceBoundary(Neumann, Neumann),
                y: FaceBoundary(Neumann, Dirichlet(0.0)),
            },
        }
    }

    /// Enforces the velocity conditions on `u` and `v` for the given lid velocity.
    pub fn apply_velocity(&self, u: &mut DMatrix<f64>, v: &mut DMatrix<f64>, u_lid: f64) {
        self.u.apply(u, u_lid);
        self.v.apply(v, u_lid);
    }
}
