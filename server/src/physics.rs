//! Ball and paddle geometry for the authoritative simulation.

use rand::Rng;
use shared::{
    BALL_ACCELERATION, BALL_SIZE, BALL_SPEED, FIELD_HEIGHT, FIELD_WIDTH, PADDLE_HEIGHT,
    PADDLE_WIDTH,
};
use std::f32::consts::FRAC_PI_2;

/// Clamps a requested paddle position into the vertical field bounds.
pub fn clamp_paddle_y(y: f32) -> f32 {
    y.clamp(0.0, FIELD_HEIGHT - PADDLE_HEIGHT)
}

/// One paddle. `x` is fixed per side at match creation; only `y` moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub x: f32,
    pub y: f32,
}

impl Paddle {
    pub fn new(x: f32) -> Self {
        Paddle {
            x,
            y: FIELD_HEIGHT / 2.0,
        }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + PADDLE_HEIGHT
    }
}

/// The ball, positioned by its top-left corner like the paddles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Ball {
    /// The opening serve: centered, both velocity signs randomized.
    pub fn serve(rng: &mut impl Rng) -> Self {
        Ball {
            x: FIELD_WIDTH / 2.0,
            y: FIELD_HEIGHT / 2.0,
            dx: if rng.gen_bool(0.5) { BALL_SPEED } else { -BALL_SPEED },
            dy: if rng.gen_bool(0.5) { BALL_SPEED } else { -BALL_SPEED },
        }
    }

    /// Re-entry after a point. `dir` signs the horizontal velocity: -1.0
    /// sends the ball toward the left seat, +1.0 toward the right, so play
    /// resumes toward the side that just conceded. Speed resets to base.
    pub fn respawn_toward(dir: f32, rng: &mut impl Rng) -> Self {
        Ball {
            x: FIELD_WIDTH / 2.0,
            y: FIELD_HEIGHT / 2.0,
            dx: BALL_SPEED * dir,
            dy: if rng.gen_bool(0.5) { BALL_SPEED } else { -BALL_SPEED },
        }
    }

    /// Moves the ball by one tick scaled by `delta`.
    pub fn advance(&mut self, delta: f32) {
        self.x += self.dx * delta;
        self.y += self.dy * delta;
    }

    /// Reflects off the top/bottom walls, clamping the position back into
    /// the field. Returns true if a bounce happened this tick.
    pub fn bounce_walls(&mut self) -> bool {
        if self.y <= 0.0 || self.y + BALL_SIZE >= FIELD_HEIGHT {
            self.y = self.y.clamp(0.0, FIELD_HEIGHT - BALL_SIZE);
            self.dy = -self.dy;
            true
        } else {
            false
        }
    }

    /// Axis-aligned overlap test against a paddle rectangle.
    pub fn overlaps(&self, paddle: &Paddle) -> bool {
        self.x <= paddle.x + PADDLE_WIDTH
            && self.x + BALL_SIZE >= paddle.x
            && self.y + BALL_SIZE >= paddle.top()
            && self.y <= paddle.bottom()
    }

    /// Deflects off a paddle. `dir` signs the outgoing horizontal velocity
    /// (+1.0 off the left paddle, -1.0 off the right). The hit point along
    /// the paddle maps to a deflection angle of up to 45° at the edges; the
    /// horizontal speed compounds by the rally acceleration with no cap.
    pub fn deflect(&mut self, paddle: &Paddle, dir: f32) {
        let hit_ratio = (self.y + BALL_SIZE / 2.0 - paddle.top()) / PADDLE_HEIGHT;
        let angle = (hit_ratio - 0.5) * FRAC_PI_2;
        self.dx = self.dx.abs() * BALL_ACCELERATION * dir;
        self.dy = BALL_SPEED * angle.sin();
    }

    /// True once the ball's right edge has left the field on the left.
    pub fn out_left(&self) -> bool {
        self.x + BALL_SIZE < 0.0
    }

    /// True once the ball's left edge has left the field on the right.
    pub fn out_right(&self) -> bool {
        self.x > FIELD_WIDTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn stationary_ball(x: f32, y: f32) -> Ball {
        Ball {
            x,
            y,
            dx: 0.0,
            dy: 0.0,
        }
    }

    #[test]
    fn serve_starts_centered_at_base_speed() {
        let ball = Ball::serve(&mut rng());
        assert_eq!(ball.x, FIELD_WIDTH / 2.0);
        assert_eq!(ball.y, FIELD_HEIGHT / 2.0);
        assert_eq!(ball.dx.abs(), BALL_SPEED);
        assert_eq!(ball.dy.abs(), BALL_SPEED);
    }

    #[test]
    fn respawn_moves_toward_conceding_side() {
        let ball = Ball::respawn_toward(-1.0, &mut rng());
        assert_eq!(ball.dx, -BALL_SPEED);
        assert_eq!(ball.x, FIELD_WIDTH / 2.0);

        let ball = Ball::respawn_toward(1.0, &mut rng());
        assert_eq!(ball.dx, BALL_SPEED);
    }

    #[test]
    fn advance_scales_by_delta() {
        let mut ball = Ball {
            x: 10.0,
            y: 20.0,
            dx: 4.0,
            dy: -2.0,
        };
        ball.advance(0.5);
        assert_approx_eq!(ball.x, 12.0);
        assert_approx_eq!(ball.y, 19.0);
    }

    #[test]
    fn bounce_clamps_and_inverts_at_top() {
        let mut ball = Ball {
            x: 50.0,
            y: -3.0,
            dx: 1.0,
            dy: -5.0,
        };
        assert!(ball.bounce_walls());
        assert_eq!(ball.y, 0.0);
        assert_eq!(ball.dy, 5.0);
    }

    #[test]
    fn bounce_clamps_and_inverts_at_bottom() {
        let mut ball = Ball {
            x: 50.0,
            y: FIELD_HEIGHT,
            dx: 1.0,
            dy: 5.0,
        };
        assert!(ball.bounce_walls());
        assert_eq!(ball.y, FIELD_HEIGHT - BALL_SIZE);
        assert_eq!(ball.dy, -5.0);
    }

    #[test]
    fn no_bounce_inside_field() {
        let mut ball = Ball {
            x: 50.0,
            y: 30.0,
            dx: 1.0,
            dy: 5.0,
        };
        assert!(!ball.bounce_walls());
        assert_eq!(ball.y, 30.0);
        assert_eq!(ball.dy, 5.0);
    }

    #[test]
    fn overlap_detects_hit_and_miss() {
        let paddle = Paddle { x: 5.0, y: 20.0 };

        let on_paddle = stationary_ball(5.5, 25.0);
        assert!(on_paddle.overlaps(&paddle));

        let past_paddle = stationary_ball(20.0, 25.0);
        assert!(!past_paddle.overlaps(&paddle));

        let above_paddle = stationary_ball(5.5, 10.0);
        assert!(!above_paddle.overlaps(&paddle));
    }

    #[test]
    fn center_hit_travels_straight() {
        let paddle = Paddle { x: 5.0, y: 20.0 };
        // Ball center exactly at paddle center
        let mut ball = Ball {
            x: 6.0,
            y: 20.0 + PADDLE_HEIGHT / 2.0 - BALL_SIZE / 2.0,
            dx: -5.0,
            dy: 3.0,
        };
        ball.deflect(&paddle, 1.0);
        assert_approx_eq!(ball.dy, 0.0, 1e-4);
        assert_approx_eq!(ball.dx, 5.0 * BALL_ACCELERATION);
    }

    #[test]
    fn edge_hit_deflects_at_45_degrees() {
        let paddle = Paddle { x: 5.0, y: 20.0 };
        // Ball center level with the paddle's top edge
        let mut ball = Ball {
            x: 6.0,
            y: 20.0 - BALL_SIZE / 2.0,
            dx: -5.0,
            dy: 3.0,
        };
        ball.deflect(&paddle, 1.0);
        let expected = BALL_SPEED * (-std::f32::consts::FRAC_PI_4).sin();
        assert_approx_eq!(ball.dy, expected, 1e-4);
    }

    #[test]
    fn deflection_compounds_speed_per_hit() {
        let paddle = Paddle { x: 5.0, y: 20.0 };
        let mut ball = Ball {
            x: 6.0,
            y: 26.0,
            dx: -BALL_SPEED,
            dy: 0.0,
        };

        for hits in 1..=8 {
            ball.deflect(&paddle, 1.0);
            let expected = BALL_SPEED * BALL_ACCELERATION.powi(hits);
            assert_approx_eq!(ball.dx.abs(), expected, 1e-3);
            // Flip the sign back as if the opposite paddle returned it
            ball.dx = -ball.dx;
        }
    }

    #[test]
    fn out_of_bounds_checks_use_ball_edges() {
        assert!(stationary_ball(-2.5, 30.0).out_left());
        assert!(!stationary_ball(-2.0, 30.0).out_left());

        assert!(stationary_ball(FIELD_WIDTH + 0.5, 30.0).out_right());
        assert!(!stationary_ball(FIELD_WIDTH, 30.0).out_right());
    }
}
