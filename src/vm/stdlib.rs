//! Bootstrap source library. Evaluated once, right after the primitives
//! and user variables are added to a fresh dictionary, to define every
//! higher-level word in terms of primitives: stack shuffling
//! conveniences, comparisons, compilation helpers, and control structures
//! (`if`/`else`/`fi`, `begin`/`again`/`until`, `do`/`loop`, `{ }x`
//! counted loops, `s"` string literals).
pub const STD_LIB: &str = concat!(
    ": .. dup . ; \n",
    ": cr 10 . ; \n",
    ": br 32 . ; \n",
    ": !    0 !! ; \n",
    ": @    0 @@ ; \n",
    ": ,    0 ,, ; \n",
    ": #    0 ## ; \n",
    ": [ 0 compiling ! ; immediate \n",
    ": ] 1 compiling ! ; \n",
    ": postpone 1 _postpone ! ; immediate \n",
    ": 1+ 1 + ; \n",
    ": 1- 1 - ; \n",
    ": over 1 pick ;\n",
    ": +!   dup @ rot + swap ! ; \n",
    ": inc  1 swap +! ; \n",
    ": dec  -1 swap +! ; \n",
    ": <    - <0 ; \n",
    ": >    swap < ; \n",
    ": <=   over over >r >r < r> r> = + ; \n",
    ": >=   swap <= ; \n",
    ": =0   0 = ; \n",
    ": not  =0 ; \n",
    ": !=   = not ; \n",
    ": here h @ ; \n",
    ": begin here ; immediate \n",
    ": again ' jmp , , ; immediate \n",
    ": until ' jmp0 , , ; immediate \n",
    ": { ' lit , 0 , ' >r , here ; immediate \n",
    ": x} ' r> , ' 1+ , ' dup , ' >r , ' = , postpone until ' r> , ' drop , ; immediate \n",
    ": exe ' lit , here dup , ' >r , ' >r , ' exit , here swap ! ; immediate \n",
    ": times { >r dup >r exe r> r> dup x} drop drop ; \n",
    ": if      ' jmp0 , here 999 , ; immediate \n",
    ": unless  ' not , postpone if ; immediate \n",
    ": else    ' jmp , here 999 , swap here swap ! ; immediate \n",
    ": fi      here swap ! ; immediate \n",
    ": i ' lit , 0 , ' pickr , ; immediate \n",
    ": j ' lit , 2 , ' pickr , ; immediate \n",
    ": do ' swap , ' >r , ' >r , here ; immediate \n",
    ": loop+ ' r> , ' + , ' dup , ' >r , ' lit , 1 , ' pickr , ' > , ' jmp0 , , ' r> , ' drop , ' r> , ' drop , ; immediate \n",
    ": loop ' lit , 1 , postpone loop+ ;  immediate \n",
    ": s\" compiling @ if ' lits , here 0 , fi here begin key dup 34 = if drop compiling @ if here swap - swap ! else dup here swap - fi exit else , fi again ; immediate \n",
);
