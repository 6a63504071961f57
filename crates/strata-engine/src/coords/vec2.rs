use core::ops::{Add, Div, Mul, Neg, Sub};

/// 2D position or offset in layer space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Counter-clockwise perpendicular.
    #[inline]
    pub const fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 { self / len } else { Self::zero() }
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perp_is_orthogonal() {
        let v = Vec2::new(3.0, 4.0);
        let p = v.perp();
        assert_eq!(v.x * p.x + v.y * p.y, 0.0);
        assert!((v.length() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn normalizing_zero_stays_zero() {
        assert_eq!(Vec2::zero().normalized(), Vec2::zero());
        assert!((Vec2::new(0.0, 2.0).normalized().y - 1.0).abs() < f32::EPSILON);
    }
}
