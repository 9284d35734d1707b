/// Move resolution: player steps, pushes and the win condition.
///
/// Operates on a live grid plus its immutable template. The template is
/// what the level looked like when parsed; it is the only record of what
/// lies "underneath" the player, since the live cell holds `Player`.
///
/// ## Destination Truth Table
/// ┌──────────────────────────────┬──────────────────────────────┐
/// │ Destination tile             │ Result                       │
/// ├──────────────────────────────┼──────────────────────────────┤
/// │ Empty / Goal                 │ MOVE                         │
/// │ One-way matching direction   │ MOVE                         │
/// │ One-way other direction      │ BLOCK                        │
/// │ Box / BoxInGoal / Key /      │ MOVE iff push succeeds       │
/// │ KeyInGoal                    │                              │
/// │ LockedDoor                   │ BLOCK (only a pushed key     │
/// │                              │ opens it)                    │
/// │ Wall / outside grid          │ BLOCK                        │
/// └──────────────────────────────┴──────────────────────────────┘
///
/// ## Push Truth Table (item at dst, far = dst + direction)
/// ┌──────────────┬──────────────┬──────────────┐
/// │ Item         │ Far tile     │ Far becomes  │
/// ├──────────────┼──────────────┼──────────────┤
/// │ box          │ Goal         │ BoxInGoal ★  │
/// │ box          │ Empty        │ Box          │
/// │ box          │ LockedDoor   │ BLOCK        │
/// │ key          │ Goal         │ KeyInGoal    │
/// │ key          │ Empty        │ Key          │
/// │ key          │ LockedDoor   │ Empty        │
/// │ any          │ other        │ BLOCK        │
/// └──────────────┴──────────────┴──────────────┘
/// The item's own cell becomes Empty (Box/Key) or Goal (BoxInGoal/KeyInGoal).
/// ★ = completion check runs.
///
/// ## Completion
/// Solved iff no cell is bare `Goal` or `KeyInGoal`, and the template
/// cell under the player is not goal-family. A key parked in a goal
/// therefore blocks completion for good.

use super::entity::{Direction, Position};
use super::grid::Grid;
use super::tile::Tile;

/// Result of one `attempt_move` call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveOutcome {
    /// Player position changed.
    pub moved: bool,
    pub level_complete: bool,
    /// Player position after the call.
    pub player: Position,
}

/// Try to move the player one cell in `dir`, pushing a box or key if needed.
///
/// Mutates `grid` in place. A blocked move leaves `grid` unchanged and is
/// safe to repeat.
pub fn attempt_move(grid: &mut Grid, template: &Grid, player: Position, dir: Direction) -> MoveOutcome {
    // Lift the player: restore whatever the template says is underneath.
    grid.set(player, template.get(player).underlying());

    let mut level_complete = false;
    let dest = player.step(dir).filter(|&dst| {
        let tile = grid.get(dst);
        if tile.is_walkable(dir) {
            true
        } else if tile.is_pushable() {
            match move_box_or_key(grid, dst, dir) {
                Some(box_on_goal) => {
                    level_complete = box_on_goal;
                    true
                }
                None => false,
            }
        } else {
            false
        }
    });

    let new_pos = dest.unwrap_or(player);
    grid.set(new_pos, Tile::Player);

    if level_complete {
        level_complete = is_solved(grid, template, new_pos);
    }

    MoveOutcome {
        moved: new_pos != player,
        level_complete,
        player: new_pos,
    }
}

/// Push the box or key at `at` one cell in `dir`.
///
/// Returns None when the push is blocked, otherwise Some(true) when a box
/// landed on a goal (the caller must re-check completion).
pub fn move_box_or_key(grid: &mut Grid, at: Position, dir: Direction) -> Option<bool> {
    let item = grid.get(at);
    if !item.is_pushable() {
        return None;
    }
    let far = at.step(dir)?;
    let is_box = item.is_box();

    let (landed, box_on_goal) = match (grid.get(far), is_box) {
        (Tile::Goal, true) => (Tile::BoxInGoal, true),
        (Tile::Empty, true) => (Tile::Box, false),
        (Tile::Goal, false) => (Tile::KeyInGoal, false),
        (Tile::Empty, false) => (Tile::Key, false),
        // Door and key are both consumed.
        (Tile::LockedDoor, false) => (Tile::Empty, false),
        _ => return None,
    };

    grid.set(far, landed);
    grid.set(at, item.underlying());
    Some(box_on_goal)
}

/// Win condition, evaluated with the player standing at `player`.
pub fn is_solved(grid: &Grid, template: &Grid, player: Position) -> bool {
    let uncovered = grid
        .cells()
        .any(|(_, t)| matches!(t, Tile::Goal | Tile::KeyInGoal));
    !uncovered && !template.get(player).is_goal_family()
}

// ══════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn map_from(rows: &[&str]) -> Grid {
        let height = rows.len();
        let width = rows[0].len();
        let mut g = Grid::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                g.set(Position::new(x, y), Tile::from_char(ch));
            }
        }
        g
    }

    fn render(g: &Grid) -> Vec<String> {
        (0..g.height())
            .map(|y| g.row(y).iter().map(|t| t.to_char()).collect())
            .collect()
    }

    /// Parse `rows` as both template and live grid, then move.
    fn play(rows: &[&str], dir: Direction) -> (Grid, MoveOutcome) {
        let template = map_from(rows);
        let mut live = template.clone();
        let p = template.find_player().expect("map has a player");
        let out = attempt_move(&mut live, &template, p, dir);
        (live, out)
    }

    // ── Plain movement ──

    #[test]
    fn walk_onto_empty() {
        let (g, out) = play(&["P-"], Direction::Right);
        assert!(out.moved);
        assert!(!out.level_complete);
        assert_eq!(out.player, Position::new(1, 0));
        assert_eq!(render(&g), ["-P"]);
    }

    #[test]
    fn wall_blocks_in_every_direction() {
        let rows = ["###", "#P#", "###"];
        for dir in Direction::ALL {
            let (g, out) = play(&rows, dir);
            assert!(!out.moved);
            assert_eq!(out.player, Position::new(1, 1));
            assert_eq!(g, map_from(&rows));
        }
    }

    #[test]
    fn grid_edge_blocks() {
        let (g, out) = play(&["P-"], Direction::Left);
        assert!(!out.moved);
        assert_eq!(render(&g), ["P-"]);
        let (_, out) = play(&["P-"], Direction::Up);
        assert!(!out.moved);
    }

    #[test]
    fn goal_under_player_is_restored() {
        let template = map_from(&["-x-"]);
        let mut live = template.clone();
        live.set(Position::new(1, 0), Tile::Player);
        let out = attempt_move(&mut live, &template, Position::new(1, 0), Direction::Right);
        assert!(out.moved);
        assert_eq!(render(&live), ["-xP"]);
    }

    #[test]
    fn one_way_respects_direction() {
        let (_, out) = play(&["P>-"], Direction::Right);
        assert!(out.moved);
        let (g, out) = play(&["-<P"], Direction::Left);
        assert!(out.moved);
        assert_eq!(render(&g), ["-P-"]);
        let (_, out) = play(&["P<-"], Direction::Right);
        assert!(!out.moved);
    }

    #[test]
    fn one_way_tile_survives_player_leaving() {
        let template = map_from(&["->-"]);
        let mut live = template.clone();
        live.set(Position::new(1, 0), Tile::Player);
        attempt_move(&mut live, &template, Position::new(1, 0), Direction::Right);
        assert_eq!(render(&live), ["->P"]);
    }

    #[test]
    fn player_cannot_walk_through_door() {
        let (g, out) = play(&["P=-"], Direction::Right);
        assert!(!out.moved);
        assert_eq!(render(&g), ["P=-"]);
    }

    // ── Pushing ──

    #[test]
    fn push_box_onto_empty() {
        let (g, out) = play(&["P@-"], Direction::Right);
        assert!(out.moved);
        assert_eq!(render(&g), ["-P@"]);
    }

    #[test]
    fn push_box_blocked_by_wall_or_box() {
        let (g, out) = play(&["P@#"], Direction::Right);
        assert!(!out.moved);
        assert_eq!(render(&g), ["P@#"]);
        let (g, out) = play(&["P@@-"], Direction::Right);
        assert!(!out.moved);
        assert_eq!(render(&g), ["P@@-"]);
    }

    #[test]
    fn push_box_out_of_grid_is_blocked() {
        let (g, out) = play(&["P@"], Direction::Right);
        assert!(!out.moved);
        assert_eq!(render(&g), ["P@"]);
    }

    #[test]
    fn box_cannot_open_door() {
        let (g, out) = play(&["P@=x"], Direction::Right);
        assert!(!out.moved);
        assert_eq!(render(&g), ["P@=x"]);
    }

    #[test]
    fn box_cannot_pass_one_way() {
        let (_, out) = play(&["P@>-"], Direction::Right);
        assert!(!out.moved);
    }

    #[test]
    fn key_opens_door_and_both_vanish() {
        let (g, out) = play(&["P*=-"], Direction::Right);
        assert!(out.moved);
        assert_eq!(render(&g), ["-P--"]);
    }

    #[test]
    fn key_in_goal_leaves_goal_when_opening_door() {
        let (g, out) = play(&["P~=-"], Direction::Right);
        assert!(out.moved);
        assert_eq!(render(&g), ["-P--"]);
        // Player now stands on the goal; it reappears once they leave.
        let template = map_from(&["P~=-"]);
        let mut live = g.clone();
        let out = attempt_move(&mut live, &template, out.player, Direction::Right);
        assert!(out.moved);
        assert_eq!(render(&live), ["-xP-"]);
    }

    #[test]
    fn key_onto_goal_becomes_key_in_goal() {
        let (g, out) = play(&["P*x"], Direction::Right);
        assert!(out.moved);
        assert!(!out.level_complete);
        assert_eq!(render(&g), ["-P~"]);
    }

    #[test]
    fn box_in_goal_pushed_off_restores_goal() {
        let (g, out) = play(&["P+-"], Direction::Right);
        assert!(out.moved);
        assert_eq!(render(&g), ["-P@"]);
        let template = map_from(&["P+-"]);
        let mut live = g.clone();
        attempt_move(&mut live, &template, out.player, Direction::Left);
        assert_eq!(render(&live), ["Px@"]);
    }

    #[test]
    fn vertical_push() {
        let (g, out) = play(&["P", "@", "x"], Direction::Down);
        assert!(out.moved);
        assert!(out.level_complete);
        assert_eq!(render(&g), ["-", "P", "+"]);
    }

    // ── Completion ──

    #[test]
    fn last_box_on_goal_completes() {
        let (g, out) = play(&["P@x"], Direction::Right);
        assert!(out.moved);
        assert!(out.level_complete);
        assert_eq!(render(&g), ["-P+"]);
    }

    #[test]
    fn one_goal_left_does_not_complete() {
        let (_, out) = play(&["P@x", "--x"], Direction::Right);
        assert!(out.moved);
        assert!(!out.level_complete);
    }

    #[test]
    fn key_in_goal_blocks_completion() {
        let (_, out) = play(&["P@x", "--~"], Direction::Right);
        assert!(out.moved);
        assert!(!out.level_complete);
    }

    #[test]
    fn player_standing_on_goal_blocks_completion() {
        // Pushing the box out of one goal into another: the player ends
        // up on the goal the box just left.
        let (g, out) = play(&["P+x"], Direction::Right);
        assert!(out.moved);
        assert!(!out.level_complete);
        assert_eq!(render(&g), ["-P+"]);
    }

    #[test]
    fn completion_ignores_walking_moves() {
        // No goals at all, but no box was pushed into a goal either.
        let (_, out) = play(&["P-"], Direction::Right);
        assert!(!out.level_complete);
    }

    #[test]
    fn extra_boxes_do_not_matter() {
        let (_, out) = play(&["P@x", "@--"], Direction::Right);
        assert!(out.level_complete);
    }

    #[test]
    fn is_solved_checks_template_under_player() {
        let template = map_from(&["x+"]);
        let mut live = template.clone();
        live.set(Position::new(0, 0), Tile::Player);
        assert!(!is_solved(&live, &template, Position::new(0, 0)));
        let template = map_from(&["-+"]);
        assert!(is_solved(&live, &template, Position::new(0, 0)));
    }

    #[test]
    fn move_box_or_key_rejects_non_items() {
        let mut g = map_from(&["--"]);
        assert_eq!(move_box_or_key(&mut g, Position::new(0, 0), Direction::Right), None);
    }
}
