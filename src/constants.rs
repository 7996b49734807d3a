/// Reference maze. `#` wall, `.` pellet, `o` power pellet, space empty,
/// `p` player start, `a`..`d` ghost starts.
pub const CLASSIC_TEMPLATE: [&str; 31] = [
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#.####.#####.##.#####.####.#",
    "#..........................#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#......##....##....##......#",
    "######.##### ## #####.######",
    "######.##### ## #####.######",
    "######.##          ##.######",
    "######.## ###  ### ##.######",
    "######.## #  b   # ##.######",
    " p     ##   c  d   ##       ",
    "######.## #   a  # ##.######",
    "######.## ###  ### ##.######",
    "######.##          ##.######",
    "######.## ######## ##.######",
    "######.## ######## ##.######",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#.####.#####.##.#####.####.#",
    "#o..##................##..o#",
    "###.##.##.########.##.##.###",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
];

pub const DEFAULT_GHOST_EPSILON: f32 = 0.1;

pub const SESSION_ID_LEN: usize = 24;

pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;
