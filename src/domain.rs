pub mod grid2d;
